//! SQLite backend.

use super::{COLUMNS, MessageFilter, Store};
use crate::{
    db,
    error::{MailError, Result},
    models::email::{DbEmail, NewEmail},
    util::contains_pattern,
};
use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database behind `db_url` and migrate it.
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        db::ensure_sqlite_path(db_url)
            .map_err(|e| MailError::Config(format!("cannot create sqlite database: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;
        db::run_sqlite_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection is kept open for the
    /// lifetime of the pool so the data is not dropped between queries.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        db::run_sqlite_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert(&self, email: NewEmail) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO emails (from_address, to_address, subject, body, received_at, attachments, is_read) VALUES (?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(email.from_address)
        .bind(email.to_address)
        .bind(email.subject)
        .bind(email.body)
        .bind(email.received_at)
        .bind(email.attachments)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<DbEmail> {
        let sql = format!("SELECT {COLUMNS} FROM emails WHERE id = ?");
        sqlx::query_as::<_, DbEmail>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(MailError::NotFound(id))
    }

    async fn list(&self, filter: &MessageFilter) -> Result<Vec<DbEmail>> {
        let rows = match filter.column() {
            Some((column, needle)) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM emails WHERE {column} LIKE ? ESCAPE '\\' ORDER BY received_at DESC, id DESC"
                );
                sqlx::query_as::<_, DbEmail>(&sql)
                    .bind(contains_pattern(needle))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {COLUMNS} FROM emails ORDER BY received_at DESC, id DESC");
                sqlx::query_as::<_, DbEmail>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn update_is_read(&self, id: i64, value: bool) -> Result<()> {
        let result = sqlx::query("UPDATE emails SET is_read = ? WHERE id = ?")
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MailError::NotFound(id));
        }
        Ok(())
    }
}
