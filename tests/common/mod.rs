//! In-process stand-in for the document host: the raw read path plus a
//! contents-style metadata/write path guarded by an incrementing revision,
//! so the optimistic write protocol can be exercised without the network.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use roster::model::Document;
use roster::store::GithubConfig;

pub struct FakeHost {
    addr: SocketAddr,
    state: Shared,
}

struct HostState {
    content: String,
    revision: u64,
    messages: Vec<String>,
}

type Shared = Arc<Mutex<HostState>>;

impl FakeHost {
    pub async fn start(initial: &Document) -> FakeHost {
        let state: Shared = Arc::new(Mutex::new(HostState {
            content: serde_json::to_string_pretty(initial).unwrap(),
            revision: 1,
            messages: Vec::new(),
        }));

        let app = Router::new()
            .route("/test-owner/roster-data/main/roster.json", get(raw))
            .route(
                "/repos/test-owner/roster-data/contents/roster.json",
                get(metadata).put(write),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        FakeHost { addr, state }
    }

    /// Adapter configuration pointing both endpoints at this host.
    pub fn config(&self) -> GithubConfig {
        let base = format!("http://{}", self.addr);
        GithubConfig {
            owner: "test-owner".to_string(),
            repo: "roster-data".to_string(),
            branch: "main".to_string(),
            file_path: "roster.json".to_string(),
            token: "test-token".to_string(),
            api_base: Some(base.clone()),
            raw_base: Some(base),
        }
    }

    pub fn revision(&self) -> u64 {
        self.state.lock().unwrap().revision
    }

    pub fn last_message(&self) -> Option<String> {
        self.state.lock().unwrap().messages.last().cloned()
    }

    /// Replace the stored body verbatim, bypassing the write path.
    pub fn set_raw_content(&self, content: &str) {
        self.state.lock().unwrap().content = content.to_string();
    }
}

fn sha(revision: u64) -> String {
    format!("rev-{revision}")
}

async fn raw(State(state): State<Shared>) -> String {
    state.lock().unwrap().content.clone()
}

async fn metadata(State(state): State<Shared>) -> Json<Value> {
    let state = state.lock().unwrap();
    Json(json!({ "path": "roster.json", "sha": sha(state.revision) }))
}

async fn write(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();

    let presented = body.get("sha").and_then(|sha| sha.as_str()).unwrap_or_default();
    if presented != sha(state.revision) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "roster.json does not match" })),
        )
            .into_response();
    }

    let encoded = body
        .get("content")
        .and_then(|content| content.as_str())
        .unwrap_or_default();
    let decoded = BASE64.decode(encoded).unwrap_or_default();
    state.content = String::from_utf8(decoded).unwrap_or_default();

    if let Some(message) = body.get("message").and_then(|message| message.as_str()) {
        state.messages.push(message.to_string());
    }

    state.revision += 1;
    Json(json!({ "content": { "sha": sha(state.revision) } })).into_response()
}

/// A port nothing listens on, for unreachable-host tests.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
