// src/message.rs
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default, rename = "modelId", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl ChatRequest {
    /// Validates the body and fills in the persona and model defaults.
    pub fn into_turn(
        self,
        default_persona: &str,
        default_model: &str,
    ) -> Result<ChatTurn, AppError> {
        let prompt_text = match self.message {
            Some(m) if !m.is_empty() => m,
            _ => return Err(AppError::InvalidRequest("Message is required".to_string())),
        };

        Ok(ChatTurn {
            prompt_text,
            persona_key: self.personality.unwrap_or_else(|| default_persona.to_string()),
            model_id: self.model_id.unwrap_or_else(|| default_model.to_string()),
        })
    }
}

/// One validated user turn, consumed by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub prompt_text: String,
    pub persona_key: String,
    pub model_id: String,
}

// ── Upstream wire types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<CompletionMessage>,
    pub stream: bool,
}

impl CompletionRequest {
    /// Exactly one system and one user message; no history is replayed.
    pub fn streaming(model: &str, system_prompt: &str, user_prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                CompletionMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                CompletionMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            stream: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

/// One `chat.completion.chunk` from the upstream stream.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Option<Vec<ChunkChoice>>,
}

impl CompletionChunk {
    /// Text at `choices[0].delta.content`, if any. Empty strings count as absent.
    pub fn into_delta(self) -> Option<String> {
        self.choices?
            .into_iter()
            .next()?
            .delta?
            .content
            .filter(|c| !c.is_empty())
    }
}

// ── Downstream events ───────────────────────────────────────────────────────

/// What the relay writes to the client, one SSE `data:` line each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamEvent {
    Delta(String),
    Done,
}

impl DownstreamEvent {
    pub fn to_json(&self) -> String {
        match self {
            DownstreamEvent::Delta(text) => json!({ "response": text }).to_string(),
            DownstreamEvent::Done => json!({ "done": true }).to_string(),
        }
    }
}

#[derive(Deserialize)]
struct DownstreamPayload {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: Option<bool>,
}

/// Decoded downstream payload as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamFrame {
    Delta(String),
    Done,
    /// Malformed JSON or a shape we don't know. Never an error.
    Ignored,
}

impl DownstreamFrame {
    pub fn parse(payload: &str) -> Self {
        match serde_json::from_str::<DownstreamPayload>(payload) {
            Ok(DownstreamPayload { response: Some(text), .. }) if !text.is_empty() => {
                DownstreamFrame::Delta(text)
            }
            Ok(DownstreamPayload { done: Some(true), .. }) => DownstreamFrame::Done,
            _ => DownstreamFrame::Ignored,
        }
    }
}

// ── Client-side messages ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
}

impl AssembledMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Sender::Bot, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(req: ChatRequest) -> Result<ChatTurn, AppError> {
        req.into_turn("spiderman", "tngtech/deepseek-r1t-chimera:free")
    }

    #[test]
    fn missing_or_empty_message_is_rejected() {
        assert!(matches!(defaults(ChatRequest::default()), Err(AppError::InvalidRequest(_))));
        let empty = ChatRequest { message: Some(String::new()), ..Default::default() };
        assert!(matches!(defaults(empty), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn persona_and_model_fall_back_to_defaults() {
        let request = ChatRequest { message: Some("hi".into()), ..Default::default() };
        let turn = defaults(request).unwrap();
        assert_eq!(turn.persona_key, "spiderman");
        assert_eq!(turn.model_id, "tngtech/deepseek-r1t-chimera:free");
    }

    #[test]
    fn request_body_uses_camel_case_model_id() {
        let body = r#"{"message":"hi","personality":"thor","modelId":"qwen/qwen3-coder:free"}"#;
        let req: ChatRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.model_id.as_deref(), Some("qwen/qwen3-coder:free"));
        assert_eq!(req.personality.as_deref(), Some("thor"));
    }

    #[test]
    fn chunk_delta_is_read_from_first_choice() {
        let payload = r#"{"choices":[{"delta":{"content":"Hel"}},{"delta":{"content":"x"}}]}"#;
        let chunk: CompletionChunk = serde_json::from_str(payload).unwrap();
        assert_eq!(chunk.into_delta().as_deref(), Some("Hel"));

        for payload in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":""}}]}"#,
            r#"{"choices":null}"#,
            r#"{"id":"gen-1"}"#,
        ] {
            let chunk: CompletionChunk = serde_json::from_str(payload).unwrap();
            assert_eq!(chunk.into_delta(), None, "{payload}");
        }
    }

    #[test]
    fn downstream_events_serialize_to_wire_shapes() {
        assert_eq!(DownstreamEvent::Delta("Hel".into()).to_json(), r#"{"response":"Hel"}"#);
        assert_eq!(DownstreamEvent::Done.to_json(), r#"{"done":true}"#);
    }

    #[test]
    fn downstream_frame_parse_is_tolerant() {
        assert_eq!(
            DownstreamFrame::parse(r#"{"response":"lo"}"#),
            DownstreamFrame::Delta("lo".into())
        );
        assert_eq!(DownstreamFrame::parse(r#"{"done":true}"#), DownstreamFrame::Done);
        assert_eq!(DownstreamFrame::parse("not-json"), DownstreamFrame::Ignored);
        assert_eq!(DownstreamFrame::parse(r#"{"response":""}"#), DownstreamFrame::Ignored);
        assert_eq!(DownstreamFrame::parse(r#"{"other":1}"#), DownstreamFrame::Ignored);
        assert_eq!(DownstreamFrame::parse("[1,2]"), DownstreamFrame::Ignored);
    }
}
