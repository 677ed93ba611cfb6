//! Network clients for the generation backend.
//!
//! # Architecture
//!
//! - [`stream`] - long-lived WebSocket carrying agent progress events for one
//!   project. Events are delivered through a callback; the returned
//!   [`StreamHandle`] owns the connection and closes it exactly once.
//! - [`manifest`] - one-shot `POST /chat/{project_id}` that runs a build and
//!   returns the generated file manifest.
//!
//! Both endpoints are derived from [`Endpoints`], which validates the base
//! URLs once at startup.
//!
//! # Error Handling
//!
//! Undecodable stream frames are logged and dropped inside the stream task.
//! Connection loss is reported as [`StreamEvent::Closed`], never as a panic.
//! Manifest failures come back as [`ManifestError`].

pub mod manifest;
pub mod stream;

use std::sync::OnceLock;
use std::time::Duration;

use kiln_types::ProjectId;
use thiserror::Error;
use url::Url;

pub use manifest::{ManifestClient, ManifestError};
pub use stream::{CloseReason, ConnectionState, StreamError, StreamEvent, StreamHandle, open_stream};

pub use kiln_types;

const CONNECT_TIMEOUT_SECS: u64 = 30;

// reqwest only exposes tcp_keepalive (idle time); interval/retries use platform defaults.
const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared client without a request timeout. Builds run for minutes.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build HTTP client: {e}. Falling back to defaults.");
            reqwest::Client::new()
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

pub fn http_client_with_timeout(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Read an error body without trusting the server to bound it.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid URL {url:?}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL {url:?} must use {expected}")]
    Scheme { url: String, expected: &'static str },
    #[error("URL {0:?} cannot carry a path")]
    CannotBeABase(String),
}

/// Validated base URLs for the two backend surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    http: Url,
    ws: Url,
}

impl Endpoints {
    pub fn new(http_url: &str, ws_url: &str) -> Result<Self, EndpointError> {
        let http = parse_base(http_url, &["http", "https"], "http:// or https://")?;
        let ws = parse_base(ws_url, &["ws", "wss"], "ws:// or wss://")?;
        Ok(Self { http, ws })
    }

    #[must_use]
    pub fn http_base(&self) -> &Url {
        &self.http
    }

    /// `{http}/chat/{project_id}`
    pub fn manifest(&self, project: &ProjectId) -> Result<Url, EndpointError> {
        join_segments(&self.http, &["chat", project.as_str()])
    }

    /// `{ws}/ws/{project_id}`
    pub fn stream(&self, project: &ProjectId) -> Result<Url, EndpointError> {
        join_segments(&self.ws, &["ws", project.as_str()])
    }
}

fn parse_base(raw: &str, schemes: &[&str], expected: &'static str) -> Result<Url, EndpointError> {
    let url = Url::parse(raw).map_err(|source| EndpointError::Parse {
        url: raw.to_string(),
        source,
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(EndpointError::Scheme {
            url: raw.to_string(),
            expected,
        });
    }
    if url.cannot_be_a_base() {
        return Err(EndpointError::CannotBeABase(raw.to_string()));
    }
    Ok(url)
}

/// Append path segments to `base`, percent-encoding each one.
pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, EndpointError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| EndpointError::CannotBeABase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
