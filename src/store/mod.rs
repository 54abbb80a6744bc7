//! Durable message store.
//!
//! The store is the only state shared between SMTP sessions and API requests.
//! Backends handle their own internal serialization, so callers hold an
//! `Arc<dyn Store>` and never lock around it.

use crate::{
    config::DatabaseConfig,
    error::{MailError, Result},
    models::email::{DbEmail, NewEmail},
};
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::{str::FromStr, sync::Arc};
use tracing::info;

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use sqlite::SqliteStore;

pub(crate) const COLUMNS: &str =
    "id, from_address, to_address, subject, body, received_at, attachments, is_read";

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a record and return its id. The record is visible to every
    /// subsequent read once this returns `Ok`.
    async fn insert(&self, email: NewEmail) -> Result<i64>;

    /// Fetch one record, `MailError::NotFound` when absent.
    async fn find_by_id(&self, id: i64) -> Result<DbEmail>;

    /// Records matching `filter`, newest `received_at` first.
    async fn list(&self, filter: &MessageFilter) -> Result<Vec<DbEmail>>;

    /// Set `is_read` regardless of its previous value.
    async fn update_is_read(&self, id: i64, value: bool) -> Result<()>;
}

/// One listing filter. Matching is a case-insensitive substring test.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageFilter {
    #[default]
    All,
    SenderContains(String),
    RecipientContains(String),
    SubjectContains(String),
}

impl MessageFilter {
    /// Column and needle for SQL backends, `None` for `All`.
    pub fn column(&self) -> Option<(&'static str, &str)> {
        match self {
            MessageFilter::All => None,
            MessageFilter::SenderContains(s) => Some(("from_address", s.as_str())),
            MessageFilter::RecipientContains(s) => Some(("to_address", s.as_str())),
            MessageFilter::SubjectContains(s) => Some(("subject", s.as_str())),
        }
    }

    pub fn matches(&self, email: &DbEmail) -> bool {
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };
        match self {
            MessageFilter::All => true,
            MessageFilter::SenderContains(s) => contains(&email.from_address, s),
            MessageFilter::RecipientContains(s) => contains(&email.to_address, s),
            MessageFilter::SubjectContains(s) => contains(&email.subject, s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Sender,
    Recipient,
    Subject,
}

/// Only one filter dimension is honored per listing. When several hints are
/// supplied the first present field in this order wins and the rest are
/// ignored.
pub const FILTER_PRECEDENCE: [FilterField; 3] =
    [FilterField::Sender, FilterField::Recipient, FilterField::Subject];

/// Raw filter hints as they arrive from the API query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterHints {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
}

impl FilterHints {
    pub fn resolve(&self) -> MessageFilter {
        self.resolve_with(&FILTER_PRECEDENCE)
    }

    /// Pick a single filter following `precedence`. Blank hints count as absent.
    pub fn resolve_with(&self, precedence: &[FilterField]) -> MessageFilter {
        for field in precedence {
            let hint = match field {
                FilterField::Sender => &self.from,
                FilterField::Recipient => &self.to,
                FilterField::Subject => &self.subject,
            };
            let Some(value) = hint.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            let value = value.to_string();
            return match field {
                FilterField::Sender => MessageFilter::SenderContains(value),
                FilterField::Recipient => MessageFilter::RecipientContains(value),
                FilterField::Subject => MessageFilter::SubjectContains(value),
            };
        }
        MessageFilter::All
    }
}

/// Open the configured backend and run its migrations.
///
/// `DATABASE_URL` picks the backend by scheme; without it the PostgreSQL
/// connection is assembled from the individual `DB_*` settings.
pub async fn connect(cfg: &DatabaseConfig) -> Result<Arc<dyn Store>> {
    match cfg.url.as_deref() {
        Some(url) if url.starts_with("sqlite:") => {
            info!("using sqlite store");
            Ok(Arc::new(SqliteStore::connect(url, cfg.max_connections).await?))
        }
        Some(url) if url.starts_with("postgres:") || url.starts_with("postgresql:") => {
            info!("using postgres store");
            let options = PgConnectOptions::from_str(url)?;
            Ok(Arc::new(PgStore::connect_with(options, cfg.max_connections).await?))
        }
        Some(url) => Err(MailError::Config(format!(
            "unsupported DATABASE_URL scheme: {}",
            url.split(':').next().unwrap_or_default()
        ))),
        None => {
            info!(
                "connecting to database: {}:{}/{}",
                cfg.host, cfg.port, cfg.name
            );
            let options = PgConnectOptions::new()
                .host(&cfg.host)
                .port(cfg.port)
                .username(&cfg.user)
                .password(&cfg.password)
                .database(&cfg.name);
            Ok(Arc::new(PgStore::connect_with(options, cfg.max_connections).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(from: Option<&str>, to: Option<&str>, subject: Option<&str>) -> FilterHints {
        FilterHints {
            from: from.map(String::from),
            to: to.map(String::from),
            subject: subject.map(String::from),
        }
    }

    #[test]
    fn sender_wins_over_recipient_and_subject() {
        let f = hints(Some("alice"), Some("bob"), Some("hello")).resolve();
        assert_eq!(f, MessageFilter::SenderContains("alice".into()));
    }

    #[test]
    fn recipient_wins_over_subject() {
        let f = hints(None, Some("bob"), Some("hello")).resolve();
        assert_eq!(f, MessageFilter::RecipientContains("bob".into()));
    }

    #[test]
    fn blank_hints_are_skipped() {
        let f = hints(Some(""), Some(""), Some("hello")).resolve();
        assert_eq!(f, MessageFilter::SubjectContains("hello".into()));
        assert_eq!(hints(None, None, None).resolve(), MessageFilter::All);
    }

    #[test]
    fn custom_precedence_is_honored() {
        let f = hints(Some("alice"), None, Some("hello"))
            .resolve_with(&[FilterField::Subject, FilterField::Sender]);
        assert_eq!(f, MessageFilter::SubjectContains("hello".into()));
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let cfg = DatabaseConfig {
            url: Some("mysql://localhost/mail".into()),
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            name: String::new(),
            max_connections: 1,
        };
        let err = connect(&cfg).await.err().unwrap();
        assert!(matches!(err, MailError::Config(ref m) if m.contains("mysql")));
    }
}
