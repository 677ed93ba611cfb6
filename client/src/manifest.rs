//! Manifest client: `POST /chat/{project_id}` with `{ "prompt": ... }`.
//!
//! The backend runs the whole build inside this request, so it can take
//! minutes. Progress arrives separately on the event stream.

use kiln_types::{Manifest, ManifestRequest, ProjectId, ServerError};
use reqwest::StatusCode;
use thiserror::Error;

use crate::{EndpointError, Endpoints, read_capped_error_body};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("manifest request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("manifest request returned {status}: {}", message.as_deref().unwrap_or(body))]
    Status {
        status: StatusCode,
        /// The server's `error` field, when the body carried one.
        message: Option<String>,
        body: String,
    },
    #[error("manifest response is not a manifest: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ManifestError {
    /// Short text for the status line.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Status { status, .. } => format!("server returned {status}"),
            Self::Request(e) if e.is_timeout() => "manifest request timed out".to_string(),
            Self::Request(e) if e.is_connect() => "could not reach the server".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManifestClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ManifestClient {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub async fn fetch(&self, project: &ProjectId, prompt: &str) -> Result<Manifest, ManifestError> {
        let url = self.endpoints.manifest(project)?;
        tracing::debug!(%url, prompt_len = prompt.len(), "Requesting manifest");

        let response = self
            .http
            .post(url)
            .json(&ManifestRequest { prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            let message = serde_json::from_str::<ServerError>(&body)
                .ok()
                .map(|e| e.error);
            return Err(ManifestError::Status {
                status,
                message,
                body,
            });
        }

        let bytes = response.bytes().await?;
        let manifest: Manifest = serde_json::from_slice(&bytes)?;

        if let Some(expected) = manifest.file_count
            && expected != manifest.files.len()
        {
            tracing::warn!(
                expected,
                actual = manifest.files.len(),
                "Manifest file_count disagrees with files"
            );
        }
        tracing::info!(
            %project,
            files = manifest.files.len(),
            sandbox = manifest.sandbox_id.as_deref().unwrap_or("-"),
            "Manifest received"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::{ManifestClient, ManifestError};
    use crate::Endpoints;
    use kiln_types::{FileRecord, ProjectId};
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ManifestClient {
        let endpoints = Endpoints::new(&server.uri(), "ws://127.0.0.1:1").unwrap();
        ManifestClient::new(reqwest::Client::new(), endpoints)
    }

    fn project() -> ProjectId {
        ProjectId::new("p1").unwrap()
    }

    #[tokio::test]
    async fn posts_prompt_and_decodes_manifest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/p1"))
            .and(body_json(serde_json::json!({ "prompt": "make a blog" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "project_id": "p1",
                "file_count": 1,
                "files": [{ "file_path": "index.html", "content": "<h1>hi</h1>" }],
                "sandbox_id": "sbx-9",
                "sandbox_active": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let manifest = client(&server).fetch(&project(), "make a blog").await.unwrap();
        assert_eq!(manifest.files, vec![FileRecord::new("index.html", "<h1>hi</h1>")]);
        assert_eq!(manifest.sandbox_id.as_deref(), Some("sbx-9"));
    }

    #[tokio::test]
    async fn conflict_surfaces_server_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/p1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "error": "A build is already running for this project"
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch(&project(), "x").await.unwrap_err();
        let ManifestError::Status {
            status, message, ..
        } = &err
        else {
            panic!("expected status error, got {err:?}");
        };
        assert_eq!(*status, StatusCode::CONFLICT);
        assert_eq!(
            message.as_deref(),
            Some("A build is already running for this project")
        );
        assert_eq!(err.summary(), "A build is already running for this project");
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).fetch(&project(), "x").await.unwrap_err();
        match &err {
            ManifestError::Status { message, body, .. } => {
                assert_eq!(message, &None);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.summary(), "server returned 502 Bad Gateway");
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"sandbox_id\": 3}"))
            .mount(&server)
            .await;

        let err = client(&server).fetch(&project(), "x").await.unwrap_err();
        assert!(matches!(err, ManifestError::Decode(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_request_error() {
        let endpoints = Endpoints::new("http://127.0.0.1:1", "ws://127.0.0.1:1").unwrap();
        let client = ManifestClient::new(reqwest::Client::new(), endpoints);
        let err = client.fetch(&project(), "x").await.unwrap_err();
        assert!(matches!(err, ManifestError::Request(_)), "{err:?}");
    }
}
