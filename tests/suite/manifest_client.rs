//! Manifest client against a mocked backend.

use kiln_client::{Endpoints, ManifestClient, ManifestError, http_client};
use kiln_types::{FileRecord, ProjectId};
use pretty_assertions::assert_eq;
use wiremock::MockServer;

use crate::common::{mount_manifest, todo_manifest};

fn client(server: &MockServer) -> ManifestClient {
    let endpoints = Endpoints::new(&server.uri(), "ws://127.0.0.1:1").unwrap();
    ManifestClient::new(http_client().clone(), endpoints)
}

#[tokio::test]
async fn fetches_full_envelope() {
    let server = MockServer::start().await;
    mount_manifest(&server, "demo", "create a todo", 200, todo_manifest(Some("sbx42"))).await;

    let manifest = client(&server)
        .fetch(&ProjectId::new("demo").unwrap(), "create a todo")
        .await
        .unwrap();

    assert_eq!(manifest.files.len(), 3);
    assert_eq!(
        manifest.files[0],
        FileRecord::new("package.json", "{ \"name\": \"todo\" }")
    );
    assert_eq!(manifest.sandbox_id.as_deref(), Some("sbx42"));
    assert_eq!(manifest.file_count, Some(3));
}

#[tokio::test]
async fn null_sandbox_is_none() {
    let server = MockServer::start().await;
    mount_manifest(&server, "demo", "x", 200, todo_manifest(None)).await;

    let manifest = client(&server)
        .fetch(&ProjectId::new("demo").unwrap(), "x")
        .await
        .unwrap();
    assert_eq!(manifest.sandbox_id, None);
}

#[tokio::test]
async fn missing_prompt_error_is_summarized() {
    let server = MockServer::start().await;
    mount_manifest(
        &server,
        "demo",
        "",
        400,
        serde_json::json!({ "error": "Prompt is required" }),
    )
    .await;

    let err = client(&server)
        .fetch(&ProjectId::new("demo").unwrap(), "")
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::Status { .. }));
    assert_eq!(err.summary(), "Prompt is required");
}
