//! Preview endpoint derivation.

use thiserror::Error;

pub const SANDBOX_PLACEHOLDER: &str = "{sandbox_id}";

/// Default sandbox host pattern: the dev server listens on port 5173.
pub const DEFAULT_PREVIEW_TEMPLATE: &str = "https://5173-{sandbox_id}.e2b.app";

/// URL pattern with a `{sandbox_id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTemplate(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("preview template {0:?} has no {{sandbox_id}} placeholder")]
pub struct PreviewTemplateError(pub String);

impl PreviewTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, PreviewTemplateError> {
        let template = template.into();
        if template.contains(SANDBOX_PLACEHOLDER) {
            Ok(Self(template))
        } else {
            Err(PreviewTemplateError(template))
        }
    }

    #[must_use]
    pub fn render(&self, sandbox_id: &str) -> String {
        self.0.replace(SANDBOX_PLACEHOLDER, sandbox_id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PreviewTemplate {
    fn default() -> Self {
        Self(DEFAULT_PREVIEW_TEMPLATE.to_string())
    }
}
