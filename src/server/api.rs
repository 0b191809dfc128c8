use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Form, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use colored::*;
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::live::{Broadcaster, Subscriber, SubscriberRegistry};
use crate::model::{Document, Status};
use crate::mutation::{Mutation, MutationEngine};
use crate::store::GithubStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<GithubStore>,
    pub engine: Arc<MutationEngine>,
    pub registry: Arc<SubscriberRegistry>,
}

/// Build the admin router with a fresh, empty subscription registry.
pub fn app(store: Arc<GithubStore>) -> Router {
    let registry = Arc::new(SubscriberRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new(store.clone(), registry.clone()));
    let engine = Arc::new(MutationEngine::new(store.clone(), broadcaster));

    let state = AppState {
        store,
        engine,
        registry,
    };

    Router::new()
        .route("/", get(admin_page))
        .route("/admin", get(admin_page))
        .route("/raw", get(raw_document))
        .route("/events", get(events))
        .route("/admin/add", post(add_entry))
        .route("/admin/delete", post(delete_entry))
        .route("/admin/block", post(block_entry))
        .route("/admin/edit", post(rename_entry))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, store: Arc<GithubStore>) -> Result<()> {
    let app = app(store);

    println!(
        "{} Roster admin running at {}",
        "✓".green(),
        format!("http://{addr}").bright_blue()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn raw_document(State(state): State<AppState>) -> Response {
    match state.store.read().await {
        Ok(document) => Json(document).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct EntryForm {
    identifier: String,
}

#[derive(Deserialize)]
struct RenameForm {
    old_identifier: String,
    new_identifier: String,
}

async fn add_entry(State(state): State<AppState>, Form(form): Form<EntryForm>) -> Response {
    mutate(&state, Mutation::Add {
        identifier: form.identifier,
    })
    .await
}

async fn delete_entry(State(state): State<AppState>, Form(form): Form<EntryForm>) -> Response {
    mutate(&state, Mutation::Delete {
        identifier: form.identifier,
    })
    .await
}

async fn block_entry(State(state): State<AppState>, Form(form): Form<EntryForm>) -> Response {
    mutate(&state, Mutation::Block {
        identifier: form.identifier,
    })
    .await
}

async fn rename_entry(State(state): State<AppState>, Form(form): Form<RenameForm>) -> Response {
    mutate(&state, Mutation::Rename {
        old_identifier: form.old_identifier,
        new_identifier: form.new_identifier,
    })
    .await
}

/// Store errors surface verbatim as a server error; a failed mutation never
/// broadcasts.
async fn mutate(state: &AppState, mutation: Mutation) -> Response {
    match state.engine.apply(mutation).await {
        Ok(_) => Redirect::to("/admin").into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn events(State(state): State<AppState>) -> Sse<KeepAliveStream<EventStream>> {
    let (subscriber, rx) = Subscriber::channel();
    let id = subscriber.id();
    state.registry.add(subscriber);
    tracing::debug!(subscriber = %id, "push stream opened");

    Sse::new(EventStream {
        rx,
        _deregister: Deregister {
            id,
            registry: state.registry.clone(),
        },
    })
    .keep_alive(KeepAlive::default())
}

/// Deregisters the subscriber when the stream, and with it the connection,
/// is dropped.
struct Deregister {
    id: Uuid,
    registry: Arc<SubscriberRegistry>,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        tracing::debug!(subscriber = %self.id, "push stream closed");
        self.registry.remove(self.id);
    }
}

pub struct EventStream {
    rx: UnboundedReceiver<String>,
    _deregister: Deregister,
}

impl Stream for EventStream {
    type Item = std::result::Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
            .map(|payload| payload.map(|p| Ok(Event::default().data(p))))
    }
}

async fn admin_page(State(state): State<AppState>) -> Response {
    match state.store.read().await {
        Ok(document) => Html(render_admin(&document)).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed loading roster: {err}"),
        )
            .into_response(),
    }
}

fn render_admin(document: &Document) -> String {
    let rows: String = document
        .entries()
        .iter()
        .map(|entry| {
            let identifier = escape(&entry.identifier);
            let status = match entry.status {
                Status::Active => "active",
                Status::Blocked => "blocked",
            };
            format!(
                r#"<tr>
  <td class="status {status}">{status}</td>
  <td class="identifier">{identifier}</td>
  <td class="actions">
    <form method="post" action="/admin/block"><input type="hidden" name="identifier" value="{identifier}"><button>block</button></form>
    <form method="post" action="/admin/delete"><input type="hidden" name="identifier" value="{identifier}"><button>delete</button></form>
    <form method="post" action="/admin/edit"><input type="hidden" name="old_identifier" value="{identifier}"><input name="new_identifier" placeholder="new identifier" required><button>rename</button></form>
  </td>
</tr>
"#
            )
        })
        .collect();

    ADMIN_TEMPLATE.replace("{{rows}}", &rows)
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const ADMIN_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Roster admin</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 52rem; color: #1f2328; }
  table { border-collapse: collapse; width: 100%; }
  th, td { border-bottom: 1px solid #d0d7de; padding: .5rem .75rem; text-align: left; }
  td.status.active { color: #1a7f37; }
  td.status.blocked { color: #cf222e; }
  td.actions form { display: inline-block; margin-right: .5rem; }
  input { padding: .25rem .5rem; }
  button { padding: .25rem .75rem; cursor: pointer; }
  #add { margin: 1.5rem 0; }
</style>
</head>
<body>
<h1>Roster admin</h1>
<form id="add" method="post" action="/admin/add">
  <input name="identifier" placeholder="identifier" autofocus>
  <button>add</button>
</form>
<table>
  <thead><tr><th>status</th><th>identifier</th><th>actions</th></tr></thead>
  <tbody>
{{rows}}
  </tbody>
</table>
<script>
  const escapeHtml = (value) => value.replace(/&/g, "&amp;").replace(/</g, "&lt;")
    .replace(/>/g, "&gt;").replace(/"/g, "&quot;");

  const row = (entry) => {
    const identifier = escapeHtml(entry.identifier);
    return `<tr>
      <td class="status ${entry.status}">${entry.status}</td>
      <td class="identifier">${identifier}</td>
      <td class="actions">
        <form method="post" action="/admin/block"><input type="hidden" name="identifier" value="${identifier}"><button>block</button></form>
        <form method="post" action="/admin/delete"><input type="hidden" name="identifier" value="${identifier}"><button>delete</button></form>
        <form method="post" action="/admin/edit"><input type="hidden" name="old_identifier" value="${identifier}"><input name="new_identifier" placeholder="new identifier" required><button>rename</button></form>
      </td>
    </tr>`;
  };

  const source = new EventSource("/events");
  source.onmessage = (event) => {
    const entries = JSON.parse(event.data);
    document.querySelector("tbody").innerHTML = entries.map(row).join("");
  };
</script>
</body>
</html>
"#;
