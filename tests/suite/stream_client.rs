//! Event stream client against a real WebSocket server.

use std::sync::{Arc, Mutex};

use kiln_client::{CloseReason, Endpoints, StreamEvent, open_stream};
use kiln_types::{ConnectionId, EventKind, ProjectId};
use pretty_assertions::assert_eq;
use tokio_tungstenite::tungstenite::Message;

use crate::common::{event, eventually, start_event_server};

type Received = Arc<Mutex<Vec<StreamEvent>>>;

fn collector() -> (Received, impl FnMut(StreamEvent) + Send + 'static) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    (received, move |event| sink.lock().unwrap().push(event))
}

fn kinds(received: &Received) -> Vec<EventKind> {
    received
        .lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Event(agent) => Some(agent.kind.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn connects_to_project_path_and_forwards_in_order() {
    let server = start_event_server(
        vec![
            event("started", "Creating project"),
            Message::text("{ not json"),
            Message::binary(br#"{"e":"file_created","message":"src/App.tsx"}"#.to_vec()),
            Message::text(r#"{"e":"command_failed","error":"npm ERR!","exit_code":1}"#),
            event("completed", "done"),
        ],
        false,
    )
    .await;

    let endpoints = Endpoints::new("http://127.0.0.1:1", &server.url).unwrap();
    let project = ProjectId::new("demo").unwrap();
    let (received, on_event) = collector();
    let handle = open_stream(&endpoints, &project, ConnectionId::new(1), on_event).unwrap();

    eventually("four agent events", || kinds(&received).len() == 4).await;

    assert_eq!(server.accepted_paths(), vec!["/ws/demo".to_string()]);
    assert_eq!(
        kinds(&received),
        vec![
            EventKind::Started,
            EventKind::FileCreated,
            EventKind::Other("command_failed".into()),
            EventKind::Completed,
        ]
    );
    let first = received.lock().unwrap().first().cloned();
    assert_eq!(first, Some(StreamEvent::Opened));
    drop(handle);
}

#[tokio::test]
async fn close_is_idempotent_and_silent() {
    let server = start_event_server(vec![event("thinking", "planning")], false).await;
    let endpoints = Endpoints::new("http://127.0.0.1:1", &server.url).unwrap();
    let (received, on_event) = collector();
    let mut handle = open_stream(
        &endpoints,
        &ProjectId::new("demo").unwrap(),
        ConnectionId::new(7),
        on_event,
    )
    .unwrap();
    assert_eq!(handle.connection(), ConnectionId::new(7));

    eventually("first event", || kinds(&received).len() == 1).await;

    assert!(handle.close());
    assert!(!handle.close());
    assert!(handle.is_closed());

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let closed_events = received
        .lock()
        .unwrap()
        .iter()
        .filter(|event| matches!(event, StreamEvent::Closed(_)))
        .count();
    assert_eq!(closed_events, 0);
}

#[tokio::test]
async fn server_close_is_reported_once() {
    let server = start_event_server(vec![event("completed", "done")], true).await;
    let endpoints = Endpoints::new("http://127.0.0.1:1", &server.url).unwrap();
    let (received, on_event) = collector();
    let _handle = open_stream(
        &endpoints,
        &ProjectId::new("demo").unwrap(),
        ConnectionId::new(1),
        on_event,
    )
    .unwrap();

    eventually("remote close", || {
        received
            .lock()
            .unwrap()
            .iter()
            .any(|event| matches!(event, StreamEvent::Closed(CloseReason::Remote)))
    })
    .await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let events = received.lock().unwrap().clone();
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Closed(CloseReason::Remote))
    );
    let closes = events
        .iter()
        .filter(|event| matches!(event, StreamEvent::Closed(_)))
        .count();
    assert_eq!(closes, 1);
}
