//! Database helpers: migrations and path handling.

use sqlx::{PgPool, SqlitePool};
use std::path::Path;

/// Create the SQLite schema if absent.
pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS emails (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_address TEXT NOT NULL,
            to_address TEXT NOT NULL,
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            received_at TEXT NOT NULL,
            attachments BLOB NULL,
            is_read BOOLEAN NOT NULL DEFAULT 0
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_emails_received_at ON emails (received_at)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Create the PostgreSQL schema if absent.
pub async fn run_postgres_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS emails (
            id BIGSERIAL PRIMARY KEY,
            from_address TEXT NOT NULL,
            to_address TEXT NOT NULL,
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            received_at TIMESTAMPTZ NOT NULL,
            attachments BYTEA NULL,
            is_read BOOLEAN NOT NULL DEFAULT FALSE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_emails_received_at ON emails (received_at)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Make sure the file behind a `sqlite:` URL can be opened: create the parent
/// folder and an empty file. In-memory URLs are left alone.
pub fn ensure_sqlite_path(db_url: &str) -> std::io::Result<()> {
    let Some(rest) = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let path_only = rest.split_once('?').map_or(rest, |(p, _)| p);
    if path_only.is_empty() || path_only == ":memory:" {
        return Ok(());
    }
    let p = Path::new(path_only);
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(p)?;
    Ok(())
}
