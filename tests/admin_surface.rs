mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::{sleep, timeout};

use common::FakeHost;
use roster::model::{Document, Entry};
use roster::store::GithubStore;

async fn spawn_admin(host: &FakeHost) -> SocketAddr {
    let store = Arc::new(GithubStore::new(host.config()).unwrap());
    let app = roster::server::api::app(store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

/// Read SSE frames off the wire until a `data:` line shows up.
async fn next_data_frame(
    stream: &mut (impl Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin),
) -> String {
    let mut buffer = String::new();
    loop {
        let chunk = stream.next().await.expect("push stream ended").unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        if let Some(data) = buffer.lines().find_map(|line| line.strip_prefix("data: ")) {
            return data.to_string();
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn raw_path_returns_the_document() {
    let initial = Document::new(vec![Entry::active("0811")]);
    let host = FakeHost::start(&initial).await;
    let addr = spawn_admin(&host).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/raw"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, serde_json::json!([{ "identifier": "0811", "status": "active" }]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn raw_path_wraps_read_failures_in_an_error_envelope() {
    let host = FakeHost::start(&Document::default()).await;
    host.set_raw_content("not a roster");
    let addr = spawn_admin(&host).await;

    let response = reqwest::get(format!("http://{addr}/raw")).await.unwrap();
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("malformed document"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn admin_page_lists_entries_and_fails_loudly() {
    let initial = Document::new(vec![Entry::active("0811")]);
    let host = FakeHost::start(&initial).await;
    let addr = spawn_admin(&host).await;

    let page = reqwest::get(format!("http://{addr}/admin"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("0811"));

    host.set_raw_content("not a roster");
    let response = reqwest::get(format!("http://{addr}/admin")).await.unwrap();
    assert_eq!(response.status(), 500);
    assert!(response.text().await.unwrap().contains("Failed loading roster"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocking_an_entry_pushes_the_snapshot_to_connected_streams() {
    let initial = Document::new(vec![Entry::active("0811")]);
    let host = FakeHost::start(&initial).await;
    let addr = spawn_admin(&host).await;

    let client = reqwest::Client::new();
    let events = client
        .get(format!("http://{addr}/events"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        events.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let mut stream = events.bytes_stream();

    // Let the subscriber registration land before mutating.
    sleep(Duration::from_millis(100)).await;

    let response = client
        .post(format!("http://{addr}/admin/block"))
        .form(&[("identifier", "0811")])
        .send()
        .await
        .unwrap();
    // The redirect to /admin is followed by the client.
    assert!(response.status().is_success());

    let payload = timeout(Duration::from_secs(5), next_data_frame(&mut stream))
        .await
        .unwrap();
    let entries: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(
        entries,
        serde_json::json!([{ "identifier": "0811", "status": "blocked" }])
    );

    // And the store itself now holds the blocked entry.
    assert!(host.last_message().as_deref() == Some("Block entry 0811"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn adding_through_the_form_reaches_a_second_viewer() {
    let initial = Document::new(vec![Entry::active("0811")]);
    let host = FakeHost::start(&initial).await;
    let addr = spawn_admin(&host).await;

    let client = reqwest::Client::new();

    // One viewer connects and immediately goes away again.
    let transient = client
        .get(format!("http://{addr}/events"))
        .send()
        .await
        .unwrap();
    drop(transient);

    let events = client
        .get(format!("http://{addr}/events"))
        .send()
        .await
        .unwrap();
    let mut stream = events.bytes_stream();

    sleep(Duration::from_millis(100)).await;

    client
        .post(format!("http://{addr}/admin/add"))
        .form(&[("identifier", "0822")])
        .send()
        .await
        .unwrap();

    let payload = timeout(Duration::from_secs(5), next_data_frame(&mut stream))
        .await
        .unwrap();
    let entries: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(
        entries,
        serde_json::json!([
            { "identifier": "0811", "status": "active" },
            { "identifier": "0822", "status": "active" }
        ])
    );
}
