//! Environment-driven configuration.
//!
//! Every value has a default so the binary starts with no environment at all.

use crate::error::{MailError, Result};
use std::{str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
  pub database: DatabaseConfig,
  pub api_port: u16,
  pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
  /// Full sqlx URL. When set it wins over the individual parts below.
  pub url: Option<String>,
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: String,
  pub name: String,
  pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
  pub listen_addr: String,
  /// Announced in the greeting and HELO/EHLO replies.
  pub domain: String,
  pub max_message_bytes: usize,
  pub max_recipients: usize,
  pub read_timeout: Duration,
  pub write_timeout: Duration,
}

impl Default for SmtpConfig {
  fn default() -> Self {
    Self {
      listen_addr: "0.0.0.0:1025".to_string(),
      domain: "localhost".to_string(),
      max_message_bytes: 1024 * 1024,
      max_recipients: 50,
      read_timeout: Duration::from_secs(10),
      write_timeout: Duration::from_secs(10),
    }
  }
}

impl Config {
  /// Read configuration from the process environment.
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Read configuration through an arbitrary key lookup. Empty values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

    let database = DatabaseConfig {
      url: get("DATABASE_URL"),
      host: text("DB_HOST", "localhost"),
      port: parsed(get("DB_PORT"), "DB_PORT", 5432)?,
      user: text("DB_USER", "postgres"),
      password: text("DB_PASSWORD", "postgres"),
      name: text("DB_NAME", "mailserver"),
      max_connections: parsed(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
    };

    let defaults = SmtpConfig::default();
    let smtp = SmtpConfig {
      listen_addr: text("SMTP_ADDR", &defaults.listen_addr),
      domain: text("SMTP_DOMAIN", &defaults.domain),
      max_message_bytes: parsed(
        get("SMTP_MAX_MESSAGE_BYTES"),
        "SMTP_MAX_MESSAGE_BYTES",
        defaults.max_message_bytes,
      )?,
      max_recipients: parsed(
        get("SMTP_MAX_RECIPIENTS"),
        "SMTP_MAX_RECIPIENTS",
        defaults.max_recipients,
      )?,
      read_timeout: Duration::from_secs(parsed(
        get("SMTP_READ_TIMEOUT_SECS"),
        "SMTP_READ_TIMEOUT_SECS",
        10,
      )?),
      write_timeout: Duration::from_secs(parsed(
        get("SMTP_WRITE_TIMEOUT_SECS"),
        "SMTP_WRITE_TIMEOUT_SECS",
        10,
      )?),
    };

    Ok(Config {
      database,
      api_port: parsed(get("PORT"), "PORT", 8080)?,
      smtp,
    })
  }
}

fn parsed<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
  match value {
    None => Ok(default),
    Some(v) => v
      .trim()
      .parse()
      .map_err(|_| MailError::Config(format!("{key} has an invalid value: {v:?}"))),
  }
}
