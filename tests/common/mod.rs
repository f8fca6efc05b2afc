#![allow(dead_code)]

use std::convert::Infallible;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chatbot_relay::{config::RelayConfig, routes::create_router, state::AppState};
use futures_util::stream::{self, StreamExt};
use serde_json::{Value, json};
use tower::util::ServiceExt;

/// What the fake completion API does with each request.
#[derive(Clone)]
pub enum Behavior {
    /// Sends the chunks, then closes the connection.
    Stream(Vec<String>),
    /// Sends the chunks, then never sends anything again.
    StreamThenStall(Vec<String>),
    /// Sends the chunks, then aborts the body with a read error.
    StreamThenFail(Vec<String>),
    /// Waits before answering with the chunks.
    Delayed(Duration, Vec<String>),
    Reject(u16, String),
}

#[derive(Default)]
struct Recorded {
    bodies: Vec<Value>,
    authorizations: Vec<Option<String>>,
}

struct Inner {
    behavior: Behavior,
    recorded: Mutex<Recorded>,
}

pub struct FakeUpstream {
    pub base_url: String,
    inner: Arc<Inner>,
}

impl FakeUpstream {
    pub async fn start(behavior: Behavior) -> Self {
        let inner = Arc::new(Inner { behavior, recorded: Mutex::new(Recorded::default()) });
        let app = Router::new()
            .route("/chat/completions", post(completions))
            .with_state(inner.clone());
        let base_url = serve(app).await;
        Self { base_url, inner }
    }

    pub fn request_count(&self) -> usize {
        self.inner.recorded.lock().unwrap().bodies.len()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.inner.recorded.lock().unwrap().bodies.last().cloned()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.inner.recorded.lock().unwrap().authorizations.last().cloned().flatten()
    }
}

async fn completions(
    State(inner): State<Arc<Inner>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    {
        let mut recorded = inner.recorded.lock().unwrap();
        recorded.bodies.push(body);
        recorded.authorizations.push(
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
    }

    match inner.behavior.clone() {
        Behavior::Stream(chunks) => event_stream(Body::from_stream(
            stream::iter(chunks).map(Ok::<_, Infallible>),
        )),
        Behavior::StreamThenStall(chunks) => event_stream(Body::from_stream(
            stream::iter(chunks).chain(stream::pending()).map(Ok::<_, Infallible>),
        )),
        Behavior::StreamThenFail(chunks) => {
            let chunks = stream::iter(chunks).map(Ok::<_, io::Error>);
            let failure = stream::once(async { Err(io::Error::other("upstream reset")) });
            event_stream(Body::from_stream(chunks.chain(failure)))
        }
        Behavior::Delayed(delay, chunks) => {
            tokio::time::sleep(delay).await;
            event_stream(Body::from_stream(stream::iter(chunks).map(Ok::<_, Infallible>)))
        }
        Behavior::Reject(status, body) => {
            (StatusCode::from_u16(status).unwrap(), body).into_response()
        }
    }
}

fn event_stream(body: Body) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}

/// Serves `app` on an ephemeral localhost port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn relay_config(upstream_base: &str) -> RelayConfig {
    RelayConfig::default()
        .with_api_key("test-key")
        .with_base_url(upstream_base)
        .with_upstream_timeout(Duration::from_secs(5))
}

pub fn relay_app(config: RelayConfig) -> Router {
    create_router().with_state(AppState::shared(config))
}

/// One upstream SSE frame carrying `content` at `choices[0].delta.content`.
pub fn upstream_frame(content: &str) -> String {
    format!("data: {}\n\n", json!({ "choices": [{ "delta": { "content": content } }] }))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub async fn send(app: Router, method: &str, uri: &str, body: &str) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

    Reply { status, headers, body: String::from_utf8(bytes.to_vec()).unwrap() }
}

pub async fn post_chat(app: Router, body: &str) -> Reply {
    send(app, "POST", "/api/chat", body).await
}
