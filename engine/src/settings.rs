//! Resolved runtime settings, built once from [`KilnConfig`].

use kiln_client::{EndpointError, Endpoints, ManifestClient};
use kiln_config::KilnConfig;
use kiln_core::{PreviewTemplate, PreviewTemplateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error(transparent)]
    Preview(#[from] PreviewTemplateError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiOptions {
    pub ascii_only: bool,
    pub high_contrast: bool,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    endpoints: Endpoints,
    manifests: ManifestClient,
    preview: PreviewTemplate,
    ui: UiOptions,
}

impl AppSettings {
    pub fn from_config(config: &KilnConfig) -> Result<Self, SettingsError> {
        let endpoints = Endpoints::new(&config.server.http_url, &config.server.ws_url)?;
        let http = match config.server.request_timeout_secs {
            Some(secs) => kiln_client::http_client_with_timeout(secs)?,
            None => kiln_client::http_client().clone(),
        };
        let preview = PreviewTemplate::new(config.preview.url_template.clone())?;
        let ui = UiOptions {
            ascii_only: config.app.ascii_only,
            high_contrast: config.app.high_contrast,
        };
        Ok(Self::new(endpoints, http, preview, ui))
    }

    #[must_use]
    pub fn new(
        endpoints: Endpoints,
        http: reqwest::Client,
        preview: PreviewTemplate,
        ui: UiOptions,
    ) -> Self {
        Self {
            manifests: ManifestClient::new(http, endpoints.clone()),
            endpoints,
            preview,
            ui,
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn manifests(&self) -> &ManifestClient {
        &self.manifests
    }

    #[must_use]
    pub fn preview(&self) -> &PreviewTemplate {
        &self.preview
    }

    #[must_use]
    pub fn ui(&self) -> UiOptions {
        self.ui
    }
}
