//! Bounded line reads.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Longest command or AUTH line kept, terminator included.
pub const MAX_LINE_LEN: usize = 2000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineRead {
    /// Bytes taken off the reader, discarded ones included. Zero means EOF.
    pub consumed: usize,
    /// The line ran past the cap; only its first `cap` bytes were kept.
    pub truncated: bool,
}

/// Append one `\n` terminated line to `buf`, keeping at most `cap` bytes of it.
///
/// The rest of an overlong line is consumed and dropped, so the reader stays
/// at a line boundary while memory use stays bounded by `cap`.
pub async fn read_capped<R>(reader: &mut R, buf: &mut Vec<u8>, cap: usize) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let start = buf.len();
    let mut read = LineRead::default();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(read);
        }
        let (len, done) = match available.iter().position(|b| *b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let room = cap.saturating_sub(buf.len() - start);
        if len > room {
            read.truncated = true;
        }
        buf.extend_from_slice(&available[..len.min(room)]);
        reader.consume(len);
        read.consumed += len;
        if done {
            return Ok(read);
        }
    }
}
