//! Streaming chat client for the relay.
//!
//! Keeps the message history a front-end renders from. Each turn appends the
//! user message, then one bot message that grows as deltas arrive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::message::{AssembledMessage, ChatRequest};
use crate::services::reassembler::Reassembler;

pub const ERROR_REPLY: &str = "Sorry, an error occurred.";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("API error: {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream closed, with or without a `done` marker. Holds the bot
    /// reply if at least one delta arrived.
    Completed(Option<AssembledMessage>),
    /// The request or the read failed and the apology was appended.
    Failed,
    /// Another turn is still streaming. Nothing was sent.
    Busy,
    /// Blank input. Nothing was sent.
    EmptyInput,
}

/// Cheap to clone; clones share history and the busy flag.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    persona: String,
    model_id: Option<String>,
    history: Arc<RwLock<Vec<AssembledMessage>>>,
    busy: Arc<AtomicBool>,
}

impl ChatClient {
    /// `base_url` is the relay root, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            persona: crate::services::personas::DEFAULT_PERSONA.to_string(),
            model_id: None,
            history: Arc::new(RwLock::new(Vec::new())),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Without a model the relay picks its default.
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn history(&self) -> Vec<AssembledMessage> {
        self.history.read().await.clone()
    }

    /// Runs one turn. `on_update` sees the bot message after every delta,
    /// and the apology if the turn fails.
    pub async fn send<F>(&self, input: &str, mut on_update: F) -> TurnOutcome
    where
        F: FnMut(&AssembledMessage),
    {
        let text = input.trim();
        if text.is_empty() {
            return TurnOutcome::EmptyInput;
        }
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!("Ignoring send while a turn is in flight");
            return TurnOutcome::Busy;
        };

        self.history.write().await.push(AssembledMessage::user(text));

        let mut reassembler = Reassembler::new();
        match self.stream_turn(text, &mut reassembler, &mut on_update).await {
            Ok(()) => TurnOutcome::Completed(reassembler.finish()),
            Err(e) => {
                error!("Chat error: {e}");
                let apology = AssembledMessage::bot(ERROR_REPLY);
                self.history.write().await.push(apology.clone());
                on_update(&apology);
                TurnOutcome::Failed
            }
        }
    }

    async fn stream_turn<F>(
        &self,
        text: &str,
        reassembler: &mut Reassembler,
        on_update: &mut F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&AssembledMessage),
    {
        let body = ChatRequest {
            message: Some(text.to_string()),
            personality: Some(self.persona.clone()),
            model_id: self.model_id.clone(),
        };

        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !reassembler.push(&chunk) {
                continue;
            }
            if let Some(message) = reassembler.message() {
                self.upsert(message).await;
                on_update(message);
            }
        }

        debug!(done_marker = reassembler.saw_done(), "Relay stream closed");
        Ok(())
    }

    /// Replaces the content of the message with the same id, or appends it.
    async fn upsert(&self, message: &AssembledMessage) {
        let mut history = self.history.write().await;
        match history.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => existing.content.clone_from(&message.content),
            None => history.push(message.clone()),
        }
    }
}

/// Holds the busy flag for the duration of one turn.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
