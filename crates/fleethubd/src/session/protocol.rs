//! Wire protocol shared by the hub and its devices.
//!
//! Devices send `<name>:<payload>` messages; the hub answers the first one
//! with [`ACCEPTED`] or [`DENIED`] and never replies afterwards. How a byte
//! stream is cut into messages depends on the configured [`Framing`].

use std::collections::VecDeque;
use std::io::{self, Read};

use fleethub_config::Framing;

/// Reply to a successful registration.
pub const ACCEPTED: &[u8] = b"ACCEPTED";

/// Reply to a refused registration.
pub const DENIED: &[u8] = b"DENIED";

/// Bytes requested from the transport per read.
pub const READ_CHUNK: usize = 1024;

/// Longest message kept in line framing; the rest of an overlong line is
/// discarded up to its terminator.
pub const LINE_LIMIT: usize = 4096;

/// One parsed `<name>:<payload>` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub name: &'a str,
    pub payload: &'a str,
}

/// Splits `line` on its first `:`. Returns `None` when there is no separator.
#[must_use]
pub fn parse_message(line: &str) -> Option<Message<'_>> {
    line.split_once(':')
        .map(|(name, payload)| Message { name, payload })
}

/// Cuts an inbound byte stream into messages.
#[derive(Debug)]
pub struct MessageReader<R> {
    inner: R,
    framing: Framing,
    pending: VecDeque<String>,
    partial: Vec<u8>,
    finished: bool,
}

impl<R: Read> MessageReader<R> {
    pub fn new(inner: R, framing: Framing) -> Self {
        Self {
            inner,
            framing,
            pending: VecDeque::new(),
            partial: Vec::new(),
            finished: false,
        }
    }

    /// Next complete message, or `None` once the peer has closed.
    ///
    /// Empty messages are skipped and a trailing `\r` is dropped. Invalid
    /// UTF-8 is replaced rather than rejected.
    pub fn next_message(&mut self) -> io::Result<Option<String>> {
        let mut buffer = [0_u8; READ_CHUNK];
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(Some(message));
            }
            if self.finished {
                return Ok(None);
            }
            let read = match self.inner.read(&mut buffer) {
                Ok(read) => read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            };
            if read == 0 {
                self.finished = true;
                self.flush_partial();
                continue;
            }
            match self.framing {
                Framing::Chunk => self.split_chunk(&buffer[..read]),
                Framing::Line => self.accumulate(&buffer[..read]),
            }
        }
    }

    fn split_chunk(&mut self, chunk: &[u8]) {
        for piece in chunk.split(|byte| *byte == b'\n') {
            self.push(piece);
        }
    }

    fn accumulate(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while let Some(position) = rest.iter().position(|byte| *byte == b'\n') {
            self.extend_partial(&rest[..position]);
            self.flush_partial();
            rest = &rest[position + 1..];
        }
        self.extend_partial(rest);
    }

    fn extend_partial(&mut self, bytes: &[u8]) {
        let room = LINE_LIMIT.saturating_sub(self.partial.len());
        self.partial.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn flush_partial(&mut self) {
        let line = std::mem::take(&mut self.partial);
        self.push(&line);
    }

    fn push(&mut self, piece: &[u8]) {
        let piece = piece.strip_suffix(b"\r").unwrap_or(piece);
        if piece.is_empty() {
            return;
        }
        self.pending
            .push_back(String::from_utf8_lossy(piece).into_owned());
    }
}
