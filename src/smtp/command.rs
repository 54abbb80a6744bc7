//! Command-line parsing.

use super::session::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Helo(String),
    Ehlo(String),
    Auth {
        mechanism: String,
        initial: Option<String>,
    },
    Mail {
        from: String,
        size: Option<usize>,
    },
    Rcpt(String),
    Data,
    Rset,
    Noop,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, SessionError> {
        let line = line.trim_end_matches(['\r', '\n']).trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((v, r)) => (v, r.trim()),
            None => (line, ""),
        };
        let cmd = match verb.to_ascii_uppercase().as_str() {
            "HELO" => Command::Helo(rest.to_string()),
            "EHLO" => Command::Ehlo(rest.to_string()),
            "AUTH" => {
                let mut parts = rest.split_whitespace();
                let mechanism = parts
                    .next()
                    .ok_or_else(|| SessionError::Syntax("AUTH requires a mechanism".into()))?
                    .to_ascii_uppercase();
                Command::Auth {
                    mechanism,
                    initial: parts.next().map(str::to_string),
                }
            }
            "MAIL" => {
                let args = strip_keyword(rest, "FROM:")
                    .ok_or_else(|| SessionError::Syntax("expected MAIL FROM:<address>".into()))?;
                let (from, params) = split_path(args);
                let mut size = None;
                for param in params.split_whitespace() {
                    if let Some(v) = strip_keyword(param, "SIZE=") {
                        size = Some(v.parse().map_err(|_| {
                            SessionError::Syntax(format!("invalid SIZE parameter: {v}"))
                        })?);
                    }
                }
                Command::Mail { from, size }
            }
            "RCPT" => {
                let args = strip_keyword(rest, "TO:")
                    .ok_or_else(|| SessionError::Syntax("expected RCPT TO:<address>".into()))?;
                let (to, _) = split_path(args);
                if to.is_empty() {
                    return Err(SessionError::Syntax("empty recipient".into()));
                }
                Command::Rcpt(to)
            }
            "DATA" => Command::Data,
            "RSET" => Command::Rset,
            "NOOP" => Command::Noop,
            "QUIT" => Command::Quit,
            _ => Command::Unknown(verb.to_string()),
        };
        Ok(cmd)
    }
}

fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| s[keyword.len()..].trim_start())
}

/// Split `<addr> PARAMS` into the bare address and the parameter tail.
fn split_path(args: &str) -> (String, &str) {
    if let Some(rest) = args.strip_prefix('<') {
        if let Some(end) = rest.find('>') {
            return (rest[..end].trim().to_string(), rest[end + 1..].trim());
        }
    }
    match args.split_once(char::is_whitespace) {
        Some((addr, params)) => (addr.to_string(), params.trim()),
        None => (args.to_string(), ""),
    }
}
