//! Numbered SMTP replies.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    /// One entry per reply line; multi-line replies use `code-text` for all but the last.
    pub lines: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    pub fn multiline(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    pub fn ok() -> Self {
        Self::new(250, "OK")
    }

    pub fn greeting(domain: &str) -> Self {
        Self::new(220, format!("{domain} ESMTP mailstash ready"))
    }

    pub fn helo(domain: &str, client: &str) -> Self {
        Self::new(250, format!("{domain} Hello {client}"))
    }

    pub fn ehlo(domain: &str, client: &str, max_message_bytes: usize) -> Self {
        Self::multiline(
            250,
            vec![
                format!("{domain} Hello {client}"),
                "8BITMIME".to_string(),
                format!("SIZE {max_message_bytes}"),
                "AUTH PLAIN LOGIN".to_string(),
            ],
        )
    }

    pub fn start_data() -> Self {
        Self::new(354, "End data with <CR><LF>.<CR><LF>")
    }

    pub fn bye() -> Self {
        Self::new(221, "Bye")
    }

    /// Wire form, CRLF terminated.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        let last = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            let sep = if i == last { ' ' } else { '-' };
            out.push_str(&format!("{}{}{}\r\n", self.code, sep, line));
        }
        if self.lines.is_empty() {
            out.push_str(&format!("{}\r\n", self.code));
        }
        out
    }
}
