use std::convert::Infallible;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use futures_util::{StreamExt, stream};
use tracing::{info, warn};

use crate::{
    error::AppError,
    message::{ChatRequest, DownstreamEvent},
    services::{
        models::catalog,
        relay::{Reframer, StreamError, UpstreamBytes},
    },
    state::SharedState,
};

/// POST `/api/chat` — relays one turn and streams the reply as SSE.
pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    if !state.upstream.is_configured() {
        return Err(AppError::Unconfigured);
    }

    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let turn = request.into_turn(&state.config.default_persona, &state.config.default_model)?;

    info!(persona = %turn.persona_key, model = %turn.model_id, "Relaying chat turn");

    let mut reframer = state.upstream.open(&turn).await?;

    // The status line is still unsent here, so a timeout can become a 408.
    let first = match reframer.next_event().await {
        Ok(event) => event,
        Err(StreamError::Timeout) => {
            warn!("Upstream timed out before the first event");
            return Err(AppError::Timeout);
        }
        Err(StreamError::Read(e)) => return Err(AppError::Internal(e)),
    };

    Ok(sse_response(first, reframer))
}

/// Any method other than POST on `/api/chat` or GET on `/api/models`.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// GET `/api/models`
pub async fn list_models_handler() -> Json<serde_json::Map<String, serde_json::Value>> {
    Json(catalog())
}

fn sse_response(first: Option<DownstreamEvent>, reframer: Reframer<UpstreamBytes>) -> Response {
    let rest = stream::unfold(reframer, |mut reframer| async move {
        match reframer.next_event().await {
            Ok(Some(event)) => Some((event, reframer)),
            Ok(None) => None,
            // Too late for a status code: end the stream without `done`.
            Err(e) => {
                warn!("Stopped forwarding: {e}");
                None
            }
        }
    });

    let events = stream::iter(first)
        .chain(rest)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));

    let mut response = Sse::new(events).into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
