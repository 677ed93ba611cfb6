//! Event stream client.
//!
//! One WebSocket per project. The connection moves through
//! `Connecting -> Open -> Closed` and never reconnects on its own. Each text
//! or binary frame is decoded as an [`AgentEvent`]; frames that fail to decode
//! are logged and skipped so one bad frame never blocks the next.
//!
//! [`open_stream`] spawns the connection task and returns a [`StreamHandle`].
//! Dropping or closing the handle closes the socket exactly once. After close
//! is requested no further events reach the callback, including frames that
//! were already read off the socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use kiln_types::{AgentEvent, ConnectionId, DecodeError, ProjectId};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::{EndpointError, Endpoints};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Why a connection ended without being asked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server closed the socket or the stream ended.
    Remote,
    /// Connect or read failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The socket is open. Emitted at most once per connection.
    Opened,
    Event(AgentEvent),
    /// Terminal. Not emitted for a close requested through the handle.
    Closed(CloseReason),
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: Url,
        #[source]
        source: Box<tungstenite::Error>,
    },
}

/// Owns a running connection. Closing is idempotent; drop closes.
#[derive(Debug)]
pub struct StreamHandle {
    connection: ConnectionId,
    closed: Arc<AtomicBool>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// True once close was requested or the connection ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Request close. Returns `false` if the connection was already closed.
    pub fn close(&mut self) -> bool {
        let already = self.closed.swap(true, Ordering::AcqRel);
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        !already
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open the event stream for `project` and deliver events to `on_event`.
///
/// Must be called from within a Tokio runtime.
pub fn open_stream<F>(
    endpoints: &Endpoints,
    project: &ProjectId,
    connection: ConnectionId,
    on_event: F,
) -> Result<StreamHandle, StreamError>
where
    F: FnMut(StreamEvent) + Send + 'static,
{
    let url = endpoints.stream(project)?;
    Ok(open_url(url, connection, on_event))
}

/// Like [`open_stream`] with a fully-formed URL.
pub fn open_url<F>(url: Url, connection: ConnectionId, on_event: F) -> StreamHandle
where
    F: FnMut(StreamEvent) + Send + 'static,
{
    let closed = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = StreamTask {
        url,
        connection,
        closed: Arc::clone(&closed),
        on_event,
    };
    tokio::spawn(task.run(shutdown_rx));

    StreamHandle {
        connection,
        closed,
        shutdown: Some(shutdown_tx),
    }
}

async fn connect(url: &Url) -> Result<WsStream, StreamError> {
    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|source| StreamError::Connect {
            url: url.clone(),
            source: Box::new(source),
        })?;
    Ok(ws)
}

struct StreamTask<F> {
    url: Url,
    connection: ConnectionId,
    closed: Arc<AtomicBool>,
    on_event: F,
}

impl<F> StreamTask<F>
where
    F: FnMut(StreamEvent) + Send + 'static,
{
    fn close_requested(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let connection = self.connection;
        tracing::info!(%connection, url = %self.url, "Connecting event stream");

        let connected = tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::debug!(%connection, "Close requested before connect finished");
                return;
            }
            result = connect(&self.url) => result,
        };

        let mut ws = match connected {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(%connection, "Event stream connect failed: {e}");
                self.finish(CloseReason::Failed(e.to_string()));
                return;
            }
        };

        if self.close_requested() {
            close_socket(&mut ws, connection).await;
            return;
        }

        tracing::info!(%connection, "Event stream open");
        (self.on_event)(StreamEvent::Opened);

        let reason = loop {
            let frame = tokio::select! {
                biased;
                _ = &mut shutdown => break None,
                frame = ws.next() => frame,
            };

            if self.close_requested() {
                tracing::debug!(%connection, "Dropping frame received after close");
                break None;
            }

            match frame {
                Some(Ok(Message::Text(text))) => {
                    self.forward(AgentEvent::decode(text.as_str()), text.len());
                }
                Some(Ok(Message::Binary(bytes))) => {
                    self.forward(AgentEvent::decode_bytes(&bytes), bytes.len());
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(%connection, ?frame, "Server closed event stream");
                    break Some(CloseReason::Remote);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(%connection, "Event stream read failed: {e}");
                    break Some(CloseReason::Failed(e.to_string()));
                }
                None => break Some(CloseReason::Remote),
            }
        };

        match reason {
            Some(reason) => self.finish(reason),
            None => close_socket(&mut ws, connection).await,
        }
    }

    fn forward(&mut self, decoded: Result<AgentEvent, DecodeError>, len: usize) {
        match decoded {
            Ok(event) => (self.on_event)(StreamEvent::Event(event)),
            Err(e) => {
                tracing::warn!(
                    connection = %self.connection,
                    bytes = len,
                    "Dropping undecodable stream frame: {e}"
                );
            }
        }
    }

    /// Mark closed and report, unless close was already requested.
    fn finish(&mut self, reason: CloseReason) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(connection = %self.connection, ?reason, "Suppressing close after request");
            return;
        }
        tracing::info!(connection = %self.connection, ?reason, "Event stream closed");
        (self.on_event)(StreamEvent::Closed(reason));
    }
}

async fn close_socket(ws: &mut WsStream, connection: ConnectionId) {
    tracing::info!(%connection, "Closing event stream");
    if let Err(e) = ws.close(None).await {
        tracing::debug!(%connection, "Close handshake failed: {e}");
    }
}
