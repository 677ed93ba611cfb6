//! Shared test utilities and fixtures
//!
//! Mock backends for integration tests: a wiremock manifest endpoint and an
//! in-process WebSocket event server.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A running event server and the request paths it has accepted.
pub struct EventServer {
    pub url: String,
    pub paths: Arc<Mutex<Vec<String>>>,
}

impl EventServer {
    pub fn accepted_paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

/// Accepts any number of connections, sends `frames` on each, then holds the
/// connection open until the client leaves. With `close_after`, the server
/// closes the socket after the last frame instead.
pub async fn start_event_server(frames: Vec<Message>, close_after: bool) -> EventServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let paths = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&paths);

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let frames = frames.clone();
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let accepted = tokio_tungstenite::accept_hdr_async(
                    tcp,
                    |request: &Request, response: Response| {
                        seen.lock().unwrap().push(request.uri().path().to_string());
                        Ok::<_, ErrorResponse>(response)
                    },
                )
                .await;
                let Ok(mut ws) = accepted else {
                    return;
                };
                for frame in frames {
                    if ws.send(frame).await.is_err() {
                        return;
                    }
                }
                if close_after {
                    let _ = ws.close(None).await;
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    EventServer {
        url: format!("ws://{addr}"),
        paths,
    }
}

pub fn event(kind: &str, message: &str) -> Message {
    Message::text(serde_json::json!({ "e": kind, "message": message }).to_string())
}

/// Mount `POST /chat/{project}` expecting `{"prompt": prompt}` exactly once.
pub async fn mount_manifest(
    server: &MockServer,
    project: &str,
    prompt: &str,
    status: u16,
    body: serde_json::Value,
) {
    Mock::given(method("POST"))
        .and(path(format!("/chat/{project}")))
        .and(body_json(serde_json::json!({ "prompt": prompt })))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

pub fn todo_manifest(sandbox_id: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "status": "success",
        "project_id": "demo",
        "files": [
            { "file_path": "package.json", "content": "{ \"name\": \"todo\" }" },
            { "file_path": "src/App.tsx", "content": "export default function App() {}\n" },
            { "file_path": "src/index.css", "content": "body { margin: 0 }" }
        ],
        "file_count": 3,
        "sandbox_id": sandbox_id,
        "sandbox_active": sandbox_id.is_some()
    })
}

/// Poll `check` every few milliseconds until it holds or five seconds pass.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if check() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {what}");
}
