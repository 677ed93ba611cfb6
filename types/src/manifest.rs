//! Manifest request and response bodies.

use serde::{Deserialize, Serialize};

/// One generated file as delivered by the manifest endpoint.
///
/// `path` is `/`-separated and relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "file_path")]
    pub path: String,
    pub content: String,
}

impl FileRecord {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/{project_id}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ManifestRequest<'a> {
    pub prompt: &'a str,
}

/// Successful manifest response.
///
/// `sandbox_id` is `null` when the backend never created a sandbox (for
/// example when generation failed before the first tool call).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub sandbox_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<usize>,
}

/// Error body returned with non-success statuses (`400`, `409`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerError {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::{FileRecord, Manifest, ManifestRequest};
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_full_backend_envelope() {
        let body = r#"{
            "status": "success",
            "project_id": "p1",
            "file_count": 2,
            "files": [
                {"file_path": "package.json", "content": "{}"},
                {"file_path": "src/app.ts", "content": "x"}
            ],
            "sandbox_id": "sbx-1",
            "sandbox_active": true
        }"#;
        let manifest: Manifest = serde_json::from_str(body).unwrap();
        assert_eq!(
            manifest.files,
            vec![
                FileRecord::new("package.json", "{}"),
                FileRecord::new("src/app.ts", "x"),
            ]
        );
        assert_eq!(manifest.sandbox_id.as_deref(), Some("sbx-1"));
        assert_eq!(manifest.file_count, Some(2));
    }

    #[test]
    fn null_sandbox_is_none() {
        let manifest: Manifest =
            serde_json::from_str(r#"{"files": [], "sandbox_id": null}"#).unwrap();
        assert!(manifest.sandbox_id.is_none());
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn missing_files_is_rejected() {
        assert!(serde_json::from_str::<Manifest>(r#"{"sandbox_id": "x"}"#).is_err());
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(ManifestRequest { prompt: "make a blog" }).unwrap();
        assert_eq!(body, serde_json::json!({ "prompt": "make a blog" }));
    }
}
