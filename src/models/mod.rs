//! Typed records used across layers.

pub mod email;
pub mod response;
