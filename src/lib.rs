//! mailstash library entrypoint.
//!
//! Modules:
//! - `app`: startup and shared state
//! - `config`: environment configuration
//! - `db`: migrations and SQLite helpers
//! - `error`: error taxonomy
//! - `http`: Axum router and handlers
//! - `models`: typed records used across layers
//! - `service`: list/get/submit/mark-read over the store
//! - `smtp`: SMTP listener and session state machine
//! - `store`: storage trait and backends
//! - `util`: tracing and SQL helpers

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod service;
pub mod smtp;
pub mod store;
pub mod util;
