//! Client side of the downstream hop: rebuilds one bot message from the
//! relay's `data: {"response": ...}` lines.

use tracing::debug;

use crate::message::{AssembledMessage, DownstreamFrame, Sender};
use crate::sse::{LineBuffer, data_payload};

/// State for a single turn. Consumed by [`Reassembler::finish`], after which
/// nothing more can be appended.
#[derive(Debug)]
pub struct Reassembler {
    lines: LineBuffer,
    message: AssembledMessage,
    started: bool,
    saw_done: bool,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            lines: LineBuffer::new(),
            message: AssembledMessage::bot(String::new()),
            started: false,
            saw_done: false,
        }
    }

    /// Feeds one network chunk. Returns `true` if the message grew.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        self.lines.extend(chunk);

        let mut grew = false;
        while let Some(line) = self.lines.next_line() {
            let Some(payload) = data_payload(&line) else {
                continue;
            };
            match DownstreamFrame::parse(payload) {
                DownstreamFrame::Delta(text) => {
                    self.message.content.push_str(&text);
                    self.started = true;
                    grew = true;
                }
                DownstreamFrame::Done => self.saw_done = true,
                DownstreamFrame::Ignored => debug!("Skipping unreadable downstream frame"),
            }
        }
        grew
    }

    /// The in-flight bot message; `None` until the first delta arrives.
    pub fn message(&self) -> Option<&AssembledMessage> {
        self.started.then_some(&self.message)
    }

    /// Whether the relay sent its terminal marker. Informational only: a
    /// stream can also just close.
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    pub fn finish(self) -> Option<AssembledMessage> {
        debug_assert_eq!(self.message.sender, Sender::Bot);
        self.started.then_some(self.message)
    }
}
