//! In-process store, used as a substitute backend in tests.

use super::{MessageFilter, Store};
use crate::{
    error::{MailError, Result},
    models::email::{DbEmail, NewEmail},
};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    emails: Vec<DbEmail>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.emails.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, email: NewEmail) -> Result<i64> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.emails.push(email.into_record(id));
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> Result<DbEmail> {
        let inner = self.inner.read().await;
        inner
            .emails
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(MailError::NotFound(id))
    }

    async fn list(&self, filter: &MessageFilter) -> Result<Vec<DbEmail>> {
        let inner = self.inner.read().await;
        let mut out: Vec<DbEmail> = inner
            .emails
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.received_at.cmp(&a.received_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn update_is_read(&self, id: i64, value: bool) -> Result<()> {
        let mut inner = self.inner.write().await;
        let email = inner
            .emails
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(MailError::NotFound(id))?;
        email.is_read = value;
        Ok(())
    }
}
