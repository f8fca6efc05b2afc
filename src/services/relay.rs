//! Upstream side of the relay: opens the completion stream and re-frames it
//! into [`DownstreamEvent`]s.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use axum::body::Bytes;
use futures_util::{Stream, StreamExt, stream::BoxStream};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::AppError;
use crate::message::{ChatTurn, CompletionChunk, CompletionRequest, DownstreamEvent};
use crate::services::personas::resolve_system_prompt;
use crate::sse::{LineBuffer, data_payload};

pub const DONE_SENTINEL: &str = "[DONE]";

pub type UpstreamBytes = BoxStream<'static, reqwest::Result<Bytes>>;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("upstream exceeded its time budget")]
    Timeout,

    #[error("upstream read failed: {0}")]
    Read(String),
}

/// How a single upstream line is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamLine {
    Skip,
    Delta(String),
    Done,
}

pub fn classify_line(line: &str) -> UpstreamLine {
    let Some(payload) = data_payload(line) else {
        return UpstreamLine::Skip;
    };
    if payload == DONE_SENTINEL {
        return UpstreamLine::Done;
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk.into_delta().map(UpstreamLine::Delta).unwrap_or(UpstreamLine::Skip),
        Err(e) => {
            debug!("Ignoring malformed upstream frame: {e}");
            UpstreamLine::Skip
        }
    }
}

/// Turns an upstream byte stream into downstream events, one per qualifying
/// `data:` line, in arrival order.
///
/// The upstream stream is dropped as soon as it is exhausted, errors, times
/// out or sends `[DONE]`. Bytes buffered after `[DONE]` are discarded.
pub struct Reframer<S> {
    upstream: Option<S>,
    lines: LineBuffer,
    ready: VecDeque<DownstreamEvent>,
    deadline: Instant,
}

impl<S, B, E> Reframer<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    pub fn new(upstream: S, deadline: Instant) -> Self {
        Self {
            upstream: Some(upstream),
            lines: LineBuffer::new(),
            ready: VecDeque::new(),
            deadline,
        }
    }

    /// Next event, `Ok(None)` once the upstream is finished.
    ///
    /// A timeout or read error also finishes the stream: later calls return
    /// `Ok(None)`.
    pub async fn next_event(&mut self) -> Result<Option<DownstreamEvent>, StreamError> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(Some(event));
            }
            let Some(upstream) = self.upstream.as_mut() else {
                return Ok(None);
            };

            let next = timeout_at(self.deadline, upstream.next()).await;
            match next {
                Err(_) => {
                    self.release();
                    return Err(StreamError::Timeout);
                }
                Ok(None) => {
                    if self.lines.pending_len() > 0 {
                        debug!(
                            pending = self.lines.pending_len(),
                            "Upstream closed with an unterminated line"
                        );
                    }
                    self.release();
                }
                Ok(Some(Err(e))) => {
                    self.release();
                    return Err(StreamError::Read(e.to_string()));
                }
                Ok(Some(Ok(chunk))) => self.absorb(chunk.as_ref()),
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.upstream.is_none() && self.ready.is_empty()
    }

    fn absorb(&mut self, chunk: &[u8]) {
        self.lines.extend(chunk);
        while let Some(line) = self.lines.next_line() {
            match classify_line(&line) {
                UpstreamLine::Skip => {}
                UpstreamLine::Delta(text) => self.ready.push_back(DownstreamEvent::Delta(text)),
                UpstreamLine::Done => {
                    self.ready.push_back(DownstreamEvent::Done);
                    self.release();
                    return;
                }
            }
        }
    }

    fn release(&mut self) {
        self.upstream = None;
        self.lines.clear();
    }
}

/// Client for the OpenAI-compatible completion endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    completions_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            completions_url: config.completions_url(),
            api_key: config.api_key.clone(),
            timeout: config.upstream_timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends the single streaming completion request for `turn`.
    ///
    /// The time budget starts here and keeps running inside the returned
    /// [`Reframer`].
    pub async fn open(&self, turn: &ChatTurn) -> Result<Reframer<UpstreamBytes>, AppError> {
        let api_key = self.api_key.as_deref().ok_or(AppError::Unconfigured)?;
        let deadline = Instant::now() + self.timeout;

        let system_prompt = resolve_system_prompt(&turn.persona_key);
        let body = CompletionRequest::streaming(&turn.model_id, &system_prompt, &turn.prompt_text);

        let send = self
            .http
            .post(&self.completions_url)
            .bearer_auth(api_key)
            .json(&body)
            .send();

        let response = match timeout_at(deadline, send).await {
            Err(_) => {
                warn!(model = %turn.model_id, "Upstream did not respond within {:?}", self.timeout);
                return Err(AppError::Timeout);
            }
            Ok(Err(e)) => return Err(AppError::Internal(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            let body = match timeout_at(deadline, response.text()).await {
                Err(_) => return Err(AppError::Timeout),
                Ok(text) => text.unwrap_or_default(),
            };
            warn!(
                status = status.as_u16(),
                model = %turn.model_id,
                "Upstream rejected chat request"
            );
            return Err(AppError::UpstreamRejected { status: status.as_u16(), body });
        }

        debug!(model = %turn.model_id, persona = %turn.persona_key, "Upstream stream opened");
        Ok(Reframer::new(response.bytes_stream().boxed(), deadline))
    }
}
