//! Line framing shared by both SSE hops.
//!
//! Network chunks never line up with SSE lines, so bytes are held in a
//! [`LineBuffer`] until a full `\n`-terminated line is available. The
//! trailing partial line always stays buffered for the next chunk.

use memchr::memchr;

/// Per-stream pending bytes. Owned by the read loop that feeds it.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one network chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Pops the next complete line without its `\n` / `\r\n` terminator.
    ///
    /// Lines are decoded only once complete, so a multi-byte character split
    /// across two chunks is never seen half-way. Invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = memchr(b'\n', &self.pending)?;
        let raw: Vec<u8> = self.pending.drain(..=newline_pos).collect();
        let line = &raw[..newline_pos];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some(String::from_utf8_lossy(line).into_owned())
    }

    /// Drops whatever is still buffered.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Bytes held back waiting for a terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Returns the payload of a `data:` line, or `None` for blank lines and
/// every other SSE field (`event:`, `id:`, comments).
pub fn data_payload(line: &str) -> Option<&str> {
    if line.trim().is_empty() {
        return None;
    }
    line.strip_prefix("data:").map(str::trim_start)
}
