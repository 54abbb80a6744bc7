//! SMTP listener.
//!
//! Supports HELO/EHLO, AUTH PLAIN/LOGIN, MAIL FROM, RCPT TO, DATA, RSET, NOOP
//! and QUIT. Each accepted connection gets its own task and [`Session`]; the
//! store is the only thing the connections share.

pub mod auth;
pub mod command;
pub mod line;
pub mod reply;
pub mod session;

use crate::{config::SmtpConfig, error::MailError, store::Store};
use auth::{AcceptAll, Authenticator};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use command::Command;
use reply::Reply;
use session::{Session, SessionError, SessionLimits};
use std::{io, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, warn};

/// Pause after a failed accept, e.g. when the process is out of descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bind the configured address and serve until the listener fails.
pub async fn start_smtp(store: Arc<dyn Store>, config: SmtpConfig) -> Result<(), MailError> {
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("smtp listener: {}", config.listen_addr);
    serve(listener, store, Arc::new(AcceptAll), config).await
}

/// Accept connections on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    store: Arc<dyn Store>,
    authenticator: Arc<dyn Authenticator>,
    config: SmtpConfig,
) -> Result<(), MailError> {
    let config = Arc::new(config);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("smtp accept error: {e}");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        debug!("smtp connection from {}", peer);
        let store = store.clone();
        let authenticator = authenticator.clone();
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, store, authenticator, &config).await {
                warn!("smtp connection error from {}: {}", peer, e);
            }
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    store: Arc<dyn Store>,
    authenticator: Arc<dyn Authenticator>,
    config: &SmtpConfig,
) -> Result<(), SessionError> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut session = Session::new(store, authenticator, SessionLimits::from(config));
    let wt = config.write_timeout;

    send(&mut writer, &Reply::greeting(&config.domain), wt).await?;

    loop {
        let line = match read_line(&mut reader, config.read_timeout).await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) if e.is_fatal() => return Err(abort(&mut writer, e, wt).await),
            Err(e) => {
                send(&mut writer, &e.reply(), wt).await?;
                continue;
            }
        };
        debug!("smtp <= {}", line.trim_end());

        let cmd = match Command::parse(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                send(&mut writer, &e.reply(), wt).await?;
                continue;
            }
        };

        let reply = match cmd {
            Command::Helo(client) => {
                session.reset();
                Reply::helo(&config.domain, &client)
            }
            Command::Ehlo(client) => {
                session.reset();
                Reply::ehlo(&config.domain, &client, config.max_message_bytes)
            }
            Command::Auth { mechanism, initial } => {
                match authenticate(&mut session, &mut reader, &mut writer, &mechanism, initial, config)
                    .await
                {
                    Ok(reply) => reply,
                    Err(e) if e.is_fatal() => return Err(abort(&mut writer, e, wt).await),
                    Err(e) => e.reply(),
                }
            }
            Command::Mail { from, size } => match session.set_sender(from, size) {
                Ok(()) => Reply::ok(),
                Err(e) => e.reply(),
            },
            Command::Rcpt(to) => match session.add_recipient(to) {
                Ok(()) => Reply::ok(),
                Err(e) => e.reply(),
            },
            Command::Data => match session.begin_data() {
                Err(e) => e.reply(),
                Ok(()) => {
                    send(&mut writer, &Reply::start_data(), wt).await?;
                    match session.receive_data(&mut reader).await {
                        // Insert failures are logged by the session; the peer still gets 250.
                        Ok(report) => {
                            debug!(
                                "data block stored for {}/{} recipients",
                                report.delivered(),
                                report.outcomes.len()
                            );
                            Reply::new(250, "OK: message accepted")
                        }
                        Err(e) if e.is_fatal() => return Err(abort(&mut writer, e, wt).await),
                        Err(e) => e.reply(),
                    }
                }
            },
            Command::Rset => {
                session.reset();
                Reply::ok()
            }
            Command::Noop => Reply::ok(),
            Command::Quit => {
                session.logout();
                send(&mut writer, &Reply::bye(), wt).await?;
                break;
            }
            Command::Unknown(verb) => Reply::new(502, format!("Command not implemented: {verb}")),
        };
        send(&mut writer, &reply, wt).await?;
    }
    session.logout();
    Ok(())
}

/// Run an AUTH exchange. Continuation lines are read from the same connection.
async fn authenticate<R, W>(
    session: &mut Session,
    reader: &mut R,
    writer: &mut W,
    mechanism: &str,
    initial: Option<String>,
    config: &SmtpConfig,
) -> Result<Reply, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (username, password) = match mechanism {
        "PLAIN" => {
            let token = match initial {
                Some(t) => t,
                None => challenge(reader, writer, "", config).await?,
            };
            // "authzid\0authcid\0password"
            let decoded = decode_b64(&token)?;
            let mut parts = decoded.split(|b| *b == 0).skip(1);
            let user = parts.next().unwrap_or_default();
            let pass = parts.next().unwrap_or_default();
            (
                String::from_utf8_lossy(user).into_owned(),
                String::from_utf8_lossy(pass).into_owned(),
            )
        }
        "LOGIN" => {
            let user = match initial {
                Some(t) => t,
                None => challenge(reader, writer, "VXNlcm5hbWU6", config).await?,
            };
            let user = decode_b64(&user)?;
            let pass = challenge(reader, writer, "UGFzc3dvcmQ6", config).await?;
            let pass = decode_b64(&pass)?;
            (
                String::from_utf8_lossy(&user).into_owned(),
                String::from_utf8_lossy(&pass).into_owned(),
            )
        }
        _ => return Ok(Reply::new(504, "Unrecognized authentication type")),
    };
    session.authenticate(&username, &password)?;
    info!("smtp client authenticated as {}", username);
    Ok(Reply::new(235, "Authentication successful"))
}

/// Send a 334 challenge and read the client's answer.
async fn challenge<R, W>(
    reader: &mut R,
    writer: &mut W,
    prompt: &str,
    config: &SmtpConfig,
) -> Result<String, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send(writer, &Reply::new(334, prompt), config.write_timeout).await?;
    let answer = read_line(reader, config.read_timeout)
        .await?
        .ok_or_else(|| {
            SessionError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "closed during AUTH"))
        })?;
    let answer = answer.trim().to_string();
    if answer == "*" {
        return Err(SessionError::Syntax("authentication cancelled".into()));
    }
    Ok(answer)
}

fn decode_b64(token: &str) -> Result<Vec<u8>, SessionError> {
    B64.decode(token.trim())
        .map_err(|_| SessionError::Syntax("invalid base64 in AUTH".into()))
}

/// One CRLF/LF terminated line, `None` on a clean close. A line longer than
/// [`line::MAX_LINE_LEN`] is drained and reported as `LineTooLong`.
async fn read_line<R>(reader: &mut R, read_timeout: Duration) -> Result<Option<String>, SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let read = tokio::time::timeout(
        read_timeout,
        line::read_capped(reader, &mut buf, line::MAX_LINE_LEN),
    )
    .await
    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "idle timeout"))??;
    if read.consumed == 0 {
        return Ok(None);
    }
    if read.truncated {
        return Err(SessionError::LineTooLong {
            max: line::MAX_LINE_LEN,
        });
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

async fn send<W>(writer: &mut W, reply: &Reply, write_timeout: Duration) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    let wire = reply.to_wire();
    debug!("smtp => {}", wire.trim_end());
    tokio::time::timeout(write_timeout, async {
        writer.write_all(wire.as_bytes()).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timeout"))??;
    Ok(())
}

/// Tell the peer the connection is going away, then hand back the error.
async fn abort<W>(writer: &mut W, err: SessionError, write_timeout: Duration) -> SessionError
where
    W: AsyncWrite + Unpin,
{
    let _ = send(
        writer,
        &Reply::new(421, "Service not available, closing transmission channel"),
        write_timeout,
    )
    .await;
    err
}
