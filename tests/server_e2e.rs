#![cfg(feature = "transport-http")]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use futures_util::StreamExt as _;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use jolla_notifications::transport::{router, AppState};
use jolla_notifications::{Backlog, BroadcastManager, Ingestor, Notification};

const THREEMA: &str = include_str!("fixtures/threema.txt");
const CLOCK: &str = include_str!("fixtures/clock.txt");

fn state(capacity: usize) -> AppState {
    AppState::new(
        Arc::new(Backlog::new(capacity)),
        Arc::new(BroadcastManager::new()),
    )
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn notifications_are_served_newest_first() {
    let state = state(10);
    state.backlog.add(Arc::new(Notification::new("t1", "Herp Derp", "3 neue Nachrichten")));
    state.backlog.add(Arc::new(Notification::new("t2", "Uhr", "Timer")));

    let html = tempfile::tempdir().unwrap();
    let (status, body) = get(router(state, html.path()), "/notifications").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            { "Time": "t2", "Summary": "Uhr", "Body": "Timer" },
            { "Time": "t1", "Summary": "Herp Derp", "Body": "3 neue Nachrichten" },
        ])
    );
}

#[tokio::test]
async fn empty_backlog_is_an_empty_array() {
    let html = tempfile::tempdir().unwrap();
    let (status, body) = get(router(state(10), html.path()), "/notifications").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn ingested_capture_is_visible_over_http() {
    let state = state(1);
    let ingestor = Ingestor::new(Arc::clone(&state.backlog), Arc::clone(&state.broadcast));
    let stream = format!("{THREEMA}\n{CLOCK}\n");
    tokio::task::spawn_blocking(move || ingestor.run(Cursor::new(stream)))
        .await
        .unwrap()
        .unwrap();

    let html = tempfile::tempdir().unwrap();
    let (_, body) = get(router(state, html.path()), "/notifications").await;
    let served: Vec<Notification> = serde_json::from_slice(&body).unwrap();
    assert_eq!(served.len(), 1);
    assert_eq!(served[0].summary(), "Uhr");
}

#[tokio::test]
async fn static_files_are_served_from_html_dir() {
    let html = tempfile::tempdir().unwrap();
    std::fs::write(html.path().join("index.html"), "<h1>Notifications</h1>").unwrap();

    let (status, body) = get(router(state(10), html.path()), "/index.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>Notifications</h1>");

    let (status, _) = get(router(state(10), html.path()), "/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn websocket_route_requires_upgrade() {
    let html = tempfile::tempdir().unwrap();
    let (status, _) = get(router(state(10), html.path()), "/websocket").await;
    assert!(status.is_client_error());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_subscriber_receives_from_ingestion_thread() {
    let state = state(10);
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Arc<Notification>>(1);
    let id = state.broadcast.add(tx);

    let ingestor = Ingestor::new(Arc::clone(&state.backlog), Arc::clone(&state.broadcast));
    let ingestion = ingestor
        .spawn(Cursor::new(format!("{THREEMA}\n{CLOCK}\n")))
        .unwrap();

    for expected in ["Herp Derp", "Uhr"] {
        let n = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n.summary(), expected);
    }

    drop(rx);
    assert!(state.broadcast.remove(id));
    let stats = ingestion.join().unwrap().unwrap();
    assert_eq!(stats.notifications, 2);
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..250 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn websocket_pushes_notifications_and_unsubscribes_on_close() {
    let state = state(10);
    let html = tempfile::tempdir().unwrap();
    let app = router(state.clone(), html.path());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/websocket"))
        .await
        .unwrap();
    wait_until(|| state.broadcast.len() == 1).await;

    let ingestor = Ingestor::new(Arc::clone(&state.backlog), Arc::clone(&state.broadcast));
    let ingestion = ingestor.spawn(Cursor::new(format!("{CLOCK}\n"))).unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {frame:?}");
    };

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let fields: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    assert_eq!(fields.len(), 3);
    assert!(json["Time"].is_string());
    assert_eq!(json["Summary"], "Uhr");
    assert_eq!(json["Body"], "Verbleibende Zeit: 17 Stunden und 18 Minuten");

    let stats = tokio::task::spawn_blocking(move || ingestion.join().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.notifications, 1);

    ws.close(None).await.unwrap();
    wait_until(|| state.broadcast.is_empty()).await;
}
