//! PostgreSQL backend.

use super::{COLUMNS, MessageFilter, Store};
use crate::{
    db,
    error::{MailError, Result},
    models::email::{DbEmail, NewEmail},
    util::contains_pattern,
};
use async_trait::async_trait;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        db::run_postgres_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, email: NewEmail) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO emails (from_address, to_address, subject, body, received_at, attachments, is_read) VALUES ($1, $2, $3, $4, $5, $6, FALSE) RETURNING id",
        )
        .bind(email.from_address)
        .bind(email.to_address)
        .bind(email.subject)
        .bind(email.body)
        .bind(email.received_at)
        .bind(email.attachments)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> Result<DbEmail> {
        let sql = format!("SELECT {COLUMNS} FROM emails WHERE id = $1");
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
                    "SELECT {COLUMNS} FROM emails WHERE {column} ILIKE $1 ESCAPE '\\' ORDER BY received_at DESC, id DESC"
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
        let result = sqlx::query("UPDATE emails SET is_read = $1 WHERE id = $2")
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
