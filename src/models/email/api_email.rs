//! API representation of an email.

use super::db_email::DbEmail;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiEmail {
  pub id: i64,
  pub from: String,
  pub to: String,
  pub subject: String,
  pub body: String,
  pub timestamp: DateTime<Utc>,
  /// Base64 of the stored blob.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub attachments: Option<String>,
  #[serde(rename = "isRead")]
  pub is_read: bool,
}

impl From<DbEmail> for ApiEmail {
  fn from(d: DbEmail) -> Self {
    ApiEmail {
      id: d.id,
      from: d.from_address,
      to: d.to_address,
      subject: d.subject,
      body: d.body,
      timestamp: d.received_at,
      attachments: d.attachments.map(|a| B64.encode(a)),
      is_read: d.is_read,
    }
  }
}
