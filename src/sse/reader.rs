//! Line-oriented `text/event-stream` scanner.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use super::event::{Event, EventBuilder};
use super::SseError;

const LF: u8 = b'\n';
const CR: u8 = b'\r';
const BOM: &[u8] = "\u{feff}".as_bytes();
const READ_CHUNK: usize = 8 * 1024;

/// Incremental reader of Server-Sent Events.
///
/// Lines may end in `\n`, `\r\n` or a bare `\r`. A blank line completes the
/// pending event. When the stream ends mid-event, the partial event is
/// returned once and every later call reports end-of-stream.
#[derive(Debug)]
pub struct EventReader<R> {
    inner: R,
    buffer: BytesMut,
    /// Bytes of `buffer` already searched for a terminator.
    scanned: usize,
    builder: EventBuilder,
    bom_checked: bool,
    eof: bool,
    finished: bool,
}

impl<R> EventReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap a byte stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            scanned: 0,
            builder: EventBuilder::default(),
            bom_checked: false,
            eof: false,
            finished: false,
        }
    }

    /// Read the next event.
    ///
    /// Returns `Ok(None)` at end-of-stream, and keeps returning it on every
    /// subsequent call.
    pub async fn read_event(&mut self) -> Result<Option<Event>, SseError> {
        loop {
            if self.finished {
                return Ok(None);
            }

            match self.next_line() {
                Some(line) if line.is_empty() => {
                    if !self.builder.is_empty() {
                        return Ok(Some(self.builder.take()));
                    }
                },
                Some(line) => self.apply_line(&line),
                None if self.eof => {
                    self.finished = true;
                    if !self.builder.is_empty() {
                        return Ok(Some(self.builder.take()));
                    }
                },
                None => self.fill().await?,
            }
        }
    }

    async fn fill(&mut self) -> Result<(), SseError> {
        self.buffer.reserve(READ_CHUNK);
        let read = self.inner.read_buf(&mut self.buffer).await?;
        if read == 0 {
            self.eof = true;
        }
        Ok(())
    }

    /// Split the next complete line off the buffer, without its terminator.
    fn next_line(&mut self) -> Option<BytesMut> {
        if !self.bom_checked {
            if self.buffer.len() < BOM.len() && BOM.starts_with(&self.buffer) && !self.eof {
                return None;
            }
            if self.buffer.starts_with(BOM) {
                self.buffer.advance(BOM.len());
            }
            self.bom_checked = true;
        }

        let (line_end, next_start) = match find_eol(&self.buffer, self.scanned) {
            Ok(found) => found,
            Err(_) if self.eof && !self.buffer.is_empty() => {
                let len = self.buffer.len();
                if self.buffer[len - 1] == CR {
                    (len - 1, len)
                } else {
                    (len, len)
                }
            },
            Err(resume) => {
                self.scanned = resume;
                return None;
            },
        };

        let line = self.buffer.split_to(line_end);
        self.buffer.advance(next_start - line_end);
        self.scanned = 0;
        Some(line)
    }

    fn apply_line(&mut self, line: &[u8]) {
        if line[0] == b':' {
            return;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            trace!(line = %String::from_utf8_lossy(line), "skipping line without field separator");
            return;
        };

        let name = String::from_utf8_lossy(&line[..colon]);
        let value = match &line[colon + 1..] {
            [b' ', rest @ ..] => rest,
            value => value,
        };
        self.builder
            .add_field(&name, &String::from_utf8_lossy(value));
    }
}

/// Find the end of the first line in `bytes`, searching from `from`.
///
/// Returns `(line_end, next_line_start)`. Without a complete terminator the
/// error holds the offset to resume from once more bytes arrive. A trailing
/// `\r` needs one more byte to tell `\r` from `\r\n`, so the search resumes
/// at it.
fn find_eol(bytes: &[u8], from: usize) -> Result<(usize, usize), usize> {
    let Some(pos) = bytes[from..]
        .iter()
        .position(|&b| b == LF || b == CR)
        .map(|i| from + i)
    else {
        return Err(bytes.len());
    };
    if bytes[pos] == LF {
        return Ok((pos, pos + 1));
    }
    match bytes.get(pos + 1) {
        None => Err(pos),
        Some(&LF) => Ok((pos, pos + 2)),
        Some(_) => Ok((pos, pos + 1)),
    }
}
