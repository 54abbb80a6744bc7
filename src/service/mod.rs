//! Read/update operations over stored emails, used by the HTTP layer.

use crate::{
  error::{MailError, Result},
  models::email::{DbEmail, SendRequest},
  store::{MessageFilter, Store},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct MailService {
  store: Arc<dyn Store>,
}

impl MailService {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  /// Emails matching `filter`, newest first.
  pub async fn list_messages(&self, filter: &MessageFilter) -> Result<Vec<DbEmail>> {
    self.store.list(filter).await
  }

  /// Fetch one email and mark it read. The lookup and the update are two
  /// separate store calls; the returned record reflects the update.
  pub async fn get_message(&self, id: i64) -> Result<DbEmail> {
    let mut email = self.store.find_by_id(id).await?;
    self.store.update_is_read(id, true).await?;
    email.is_read = true;
    Ok(email)
  }

  /// Store a caller-supplied email directly, stamped with the current time.
  /// Nothing goes over SMTP.
  pub async fn submit_message(&self, req: SendRequest) -> Result<i64> {
    let email = req.into_new_email(Utc::now())?;
    let id = self.store.insert(email).await?;
    info!("stored email {} via direct submission", id);
    Ok(id)
  }

  /// Mark an email read. An unknown id is a silent no-op.
  pub async fn mark_read(&self, id: i64) -> Result<()> {
    match self.store.update_is_read(id, true).await {
      Err(MailError::NotFound(_)) => {
        debug!("mark_read: email {} does not exist", id);
        Ok(())
      }
      other => other,
    }
  }
}
