//! Database row for an email.
//!
//! One row per recipient of a delivery. Only `is_read` changes after insert.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbEmail {
    pub id: i64,
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
    pub attachments: Option<Vec<u8>>,
    pub is_read: bool,
}
