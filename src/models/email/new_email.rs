//! Insert payload: a record before the store assigns its id.

use super::db_email::DbEmail;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmail {
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
    pub attachments: Option<Vec<u8>>,
}

impl NewEmail {
    /// Materialize the stored record under `id`. Fresh records are unread.
    pub fn into_record(self, id: i64) -> DbEmail {
        DbEmail {
            id,
            from_address: self.from_address,
            to_address: self.to_address,
            subject: self.subject,
            body: self.body,
            received_at: self.received_at,
            attachments: self.attachments,
            is_read: false,
        }
    }
}
