//! Error taxonomy shared by the store, the query service and the SMTP path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
  /// Connection-level I/O failure, including idle timeouts.
  #[error("transport error: {0}")]
  Transport(#[from] std::io::Error),

  #[error("persistence error: {0}")]
  Persistence(#[from] sqlx::Error),

  #[error("email {0} not found")]
  NotFound(i64),

  #[error("invalid payload: {0}")]
  Validation(String),

  #[error("configuration error: {0}")]
  Config(String),
}

pub type Result<T> = std::result::Result<T, MailError>;
