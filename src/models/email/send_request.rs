//! Body of a direct submission.
//!
//! Direct submission writes straight into the store. Nothing is transmitted
//! over SMTP, so "send" here means "store as if it had been delivered".

use super::new_email::NewEmail;
use crate::error::{MailError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SendRequest {
  pub from: String,
  pub to: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub body: String,
  /// Base64 encoded blob.
  #[serde(default)]
  pub attachments: Option<String>,
}

impl SendRequest {
  /// Validate the request and stamp it with `received_at`.
  pub fn into_new_email(self, received_at: DateTime<Utc>) -> Result<NewEmail> {
    if self.from.trim().is_empty() {
      return Err(MailError::Validation("field 'from' must not be empty".into()));
    }
    if self.to.trim().is_empty() {
      return Err(MailError::Validation("field 'to' must not be empty".into()));
    }
    let attachments = match self.attachments {
      Some(encoded) => Some(
        B64
          .decode(encoded.trim())
          .map_err(|e| MailError::Validation(format!("field 'attachments' is not base64: {e}")))?,
      ),
      None => None,
    };
    Ok(NewEmail {
      from_address: self.from,
      to_address: self.to,
      subject: self.subject,
      body: self.body,
      received_at,
      attachments,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request(from: &str, to: &str) -> SendRequest {
    SendRequest {
      from: from.into(),
      to: to.into(),
      subject: "s".into(),
      body: "b".into(),
      attachments: None,
    }
  }

  #[test]
  fn valid_request_keeps_fields() {
    let now = Utc::now();
    let new = request("a@example.com", "b@example.com")
      .into_new_email(now)
      .unwrap();
    assert_eq!(new.from_address, "a@example.com");
    assert_eq!(new.to_address, "b@example.com");
    assert_eq!(new.subject, "s");
    assert_eq!(new.body, "b");
    assert_eq!(new.received_at, now);
  }

  #[test]
  fn blank_addresses_are_rejected() {
    assert!(matches!(
      request(" ", "b@example.com").into_new_email(Utc::now()),
      Err(MailError::Validation(_))
    ));
    assert!(matches!(
      request("a@example.com", "").into_new_email(Utc::now()),
      Err(MailError::Validation(_))
    ));
  }

  #[test]
  fn attachments_are_decoded() {
    let mut req = request("a@example.com", "b@example.com");
    req.attachments = Some("QUJD".into());
    let new = req.into_new_email(Utc::now()).unwrap();
    assert_eq!(new.attachments.as_deref(), Some(&b"ABC"[..]));

    let mut bad = request("a@example.com", "b@example.com");
    bad.attachments = Some("***".into());
    assert!(matches!(
      bad.into_new_email(Utc::now()),
      Err(MailError::Validation(_))
    ));
  }

  #[test]
  fn missing_optional_fields_default() {
    let req: SendRequest =
      serde_json::from_str(r#"{"from":"a@example.com","to":"b@example.com"}"#).unwrap();
    assert_eq!(req.subject, "");
    assert_eq!(req.body, "");
    assert!(req.attachments.is_none());
  }
}
