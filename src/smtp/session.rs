//! Per-connection SMTP session state.
//!
//! `Idle -> SenderSet -> RecipientSet (repeatable) -> Receiving`, then back to
//! `Idle` once the data block has been delivered. `reset` returns to `Idle`
//! from anywhere and `logout` ends the session.

use super::{auth::Authenticator, line, reply::Reply};
use crate::{
    config::SmtpConfig,
    error::MailError,
    models::email::NewEmail,
    store::Store,
};
use chrono::{DateTime, Utc};
use std::{io, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tracing::{info, warn};

/// Subject given to every record stored from SMTP. Header parsing is not done.
pub const PLACEHOLDER_SUBJECT: &str = "(no subject)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SenderSet,
    RecipientSet,
    Receiving,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Bad sequence of commands: {0}")]
    BadSequence(&'static str),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Too many recipients (max {max})")]
    TooManyRecipients { max: usize },

    #[error("Message exceeds fixed maximum message size ({max} bytes)")]
    MessageTooLarge { max: usize },

    #[error("Line too long (max {max} bytes)")]
    LineTooLong { max: usize },

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Connection error: {0}")]
    Transport(#[from] io::Error),
}

impl SessionError {
    pub fn reply(&self) -> Reply {
        let code = match self {
            SessionError::BadSequence(_) => 503,
            SessionError::Syntax(_) => 501,
            SessionError::TooManyRecipients { .. } => 452,
            SessionError::MessageTooLarge { .. } => 552,
            SessionError::LineTooLong { .. } => 500,
            SessionError::AuthFailed => 535,
            SessionError::Transport(_) => 421,
        };
        Reply::new(code, self.to_string())
    }

    /// Whether the connection can keep going after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub max_message_bytes: usize,
    pub max_recipients: usize,
    pub read_timeout: Duration,
}

impl From<&SmtpConfig> for SessionLimits {
    fn from(cfg: &SmtpConfig) -> Self {
        Self {
            max_message_bytes: cfg.max_message_bytes,
            max_recipients: cfg.max_recipients,
            read_timeout: cfg.read_timeout,
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from(&SmtpConfig::default())
    }
}

/// Result of one insert attempt.
#[derive(Debug)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub result: Result<i64, MailError>,
}

/// Per-recipient outcomes of one data block, in recipient declaration order.
/// Inserts are independent: a failure for one recipient does not undo or
/// prevent the others.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<RecipientOutcome>,
}

impl DeliveryReport {
    pub fn stored_ids(&self) -> Vec<i64> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().copied())
            .collect()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

pub struct Session {
    store: Arc<dyn Store>,
    authenticator: Arc<dyn Authenticator>,
    limits: SessionLimits,
    state: SessionState,
    sender: Option<String>,
    recipients: Vec<String>,
    user: Option<String>,
    started_at: DateTime<Utc>,
    closed: bool,
}

impl Session {
    pub fn new(
        store: Arc<dyn Store>,
        authenticator: Arc<dyn Authenticator>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            store,
            authenticator,
            limits,
            state: SessionState::Idle,
            sender: None,
            recipients: Vec::new(),
            user: None,
            started_at: Utc::now(),
            closed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn authenticated_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::BadSequence("AUTH not permitted during a mail transaction"));
        }
        if !self.authenticator.verify(username, password) {
            return Err(SessionError::AuthFailed);
        }
        self.user = Some(username.to_string());
        Ok(())
    }

    /// No syntax check is applied to `address`.
    pub fn set_sender(
        &mut self,
        address: String,
        declared_size: Option<usize>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::BadSequence("nested MAIL command"));
        }
        if declared_size.is_some_and(|size| size > self.limits.max_message_bytes) {
            return Err(SessionError::MessageTooLarge {
                max: self.limits.max_message_bytes,
            });
        }
        self.sender = Some(address);
        self.recipients.clear();
        self.state = SessionState::SenderSet;
        Ok(())
    }

    /// Order is preserved and duplicates are kept.
    pub fn add_recipient(&mut self, address: String) -> Result<(), SessionError> {
        if !matches!(
            self.state,
            SessionState::SenderSet | SessionState::RecipientSet
        ) {
            return Err(SessionError::BadSequence("need MAIL command before RCPT"));
        }
        if self.recipients.len() >= self.limits.max_recipients {
            return Err(SessionError::TooManyRecipients {
                max: self.limits.max_recipients,
            });
        }
        self.recipients.push(address);
        self.state = SessionState::RecipientSet;
        Ok(())
    }

    /// Accept a `DATA` command. The caller sends the 354 reply and then hands
    /// the reader to [`Session::receive_data`].
    pub fn begin_data(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::RecipientSet => {
                self.state = SessionState::Receiving;
                Ok(())
            }
            SessionState::Idle => Err(SessionError::BadSequence("need MAIL command before DATA")),
            _ => Err(SessionError::BadSequence("need RCPT command before DATA")),
        }
    }

    /// Read the dot-terminated payload and store one record per recipient.
    ///
    /// A read failure or an oversized payload stores nothing. Either way the
    /// envelope is cleared afterwards.
    pub async fn receive_data<R>(&mut self, reader: &mut R) -> Result<DeliveryReport, SessionError>
    where
        R: AsyncBufRead + Unpin,
    {
        if self.state != SessionState::Receiving {
            return Err(SessionError::BadSequence("DATA not accepted"));
        }
        let payload = read_payload(
            reader,
            self.limits.max_message_bytes,
            self.limits.read_timeout,
        )
        .await;
        let payload = match payload {
            Ok(p) => p,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        let received_at = Utc::now();
        let body = String::from_utf8_lossy(&payload).into_owned();
        let sender = self.sender.take().unwrap_or_default();
        let recipients = std::mem::take(&mut self.recipients);
        self.reset();

        Ok(self.deliver(sender, recipients, body, received_at).await)
    }

    async fn deliver(
        &self,
        sender: String,
        recipients: Vec<String>,
        body: String,
        received_at: DateTime<Utc>,
    ) -> DeliveryReport {
        let mut outcomes = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let email = NewEmail {
                from_address: sender.clone(),
                to_address: recipient.clone(),
                subject: PLACEHOLDER_SUBJECT.to_string(),
                body: body.clone(),
                received_at,
                attachments: None,
            };
            let result = self.store.insert(email).await;
            match &result {
                Ok(id) => info!("stored email {} for {}", id, recipient),
                Err(e) => warn!("failed to store email for {}: {}", recipient, e),
            }
            outcomes.push(RecipientOutcome { recipient, result });
        }
        DeliveryReport { outcomes }
    }

    /// Clear the envelope. Stored records are unaffected.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.sender = None;
        self.recipients.clear();
    }

    pub fn logout(&mut self) {
        self.reset();
        self.user = None;
        self.closed = true;
    }
}

/// Collect the data block up to the lone `.` line, undoing dot-stuffing.
///
/// The limit counts unstuffed bytes including line terminators. Each read is
/// capped at what is left of the limit, so an oversized block never sits in
/// memory. Past the limit the rest of the block is still drained so the
/// connection stays in sync. The line break before the terminating dot is not
/// kept.
async fn read_payload<R>(
    reader: &mut R,
    max: usize,
    read_timeout: Duration,
) -> Result<Vec<u8>, SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut payload = Vec::new();
    let mut oversized = false;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // Room for a stuffed dot on top of the remaining budget, and never
        // less than a terminator line.
        let cap = if oversized {
            3
        } else {
            (max - payload.len()).saturating_add(2).max(3)
        };
        let read = tokio::time::timeout(read_timeout, line::read_capped(reader, &mut buf, cap))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "idle timeout during DATA"))??;
        if read.consumed == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before end of data",
            )
            .into());
        }
        if !read.truncated && (buf == b".\r\n" || buf == b".\n") {
            break;
        }
        if oversized {
            continue;
        }
        let content = if buf.starts_with(b"..") {
            &buf[1..]
        } else {
            &buf[..]
        };
        if read.truncated || payload.len() + content.len() > max {
            oversized = true;
            payload = Vec::new();
            continue;
        }
        payload.extend_from_slice(content);
    }
    if oversized {
        return Err(SessionError::MessageTooLarge { max });
    }
    if payload.ends_with(b"\r\n") {
        payload.truncate(payload.len() - 2);
    } else if payload.ends_with(b"\n") {
        payload.truncate(payload.len() - 1);
    }
    Ok(payload)
}
