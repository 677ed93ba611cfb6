//! Configuration for Kiln, read from `~/.kiln/config.toml`.
//!
//! ```toml
//! [server]
//! http_url = "http://localhost:8000"
//! ws_url = "ws://localhost:8000"
//! request_timeout_secs = 900
//!
//! [preview]
//! url_template = "https://5173-{sandbox_id}.e2b.app"
//!
//! [app]
//! default_prompt = "create a todo"
//! ascii_only = false
//! high_contrast = false
//! ```
//!
//! Every key is optional. String values may reference environment variables
//! as `${VAR}`. `KILN_HTTP_URL` and `KILN_WS_URL` override the server URLs.

use std::path::{Path, PathBuf};
use std::{env, fs};

pub use kiln_core::DEFAULT_PREVIEW_TEMPLATE;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_HTTP_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";
pub const DEFAULT_PROMPT: &str = "create a todo";

pub const HTTP_URL_ENV: &str = "KILN_HTTP_URL";
pub const WS_URL_ENV: &str = "KILN_WS_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KilnConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Manifest endpoint base: `POST {http_url}/chat/{project_id}`.
    pub http_url: String,
    /// Stream endpoint base: `{ws_url}/ws/{project_id}`.
    pub ws_url: String,
    /// Timeout for the manifest request. Unset means wait for the build.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_url: DEFAULT_HTTP_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Must contain `{sandbox_id}`.
    pub url_template: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_PREVIEW_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seed prompt when none is given on the command line.
    pub default_prompt: String,
    /// Use ASCII-only glyphs for icons and spinners.
    pub ascii_only: bool,
    /// Enable a high-contrast color palette.
    pub high_contrast: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_prompt: DEFAULT_PROMPT.to_string(),
            ascii_only: false,
            high_contrast: false,
        }
    }
}

/// Replace `${VAR}` with the variable's value (empty when unset).
/// An unclosed `${` is kept verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, |name| env::var(name).ok())
}

fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        if !name.is_empty() {
            out.push_str(&lookup(name).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

impl KilnConfig {
    /// Read the config file. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Load, fall back to defaults on any error, then apply `${VAR}`
    /// expansion and environment overrides.
    #[must_use]
    pub fn resolve() -> Self {
        let config = match Self::load() {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!("Using default config: {err}");
                Self::default()
            }
        };
        config.resolve_env()
    }

    /// Apply `${VAR}` expansion and the `KILN_*_URL` overrides from the
    /// process environment.
    #[must_use]
    pub fn resolve_env(self) -> Self {
        self.finish(|name| env::var(name).ok())
    }

    fn finish(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for value in [
            &mut self.server.http_url,
            &mut self.server.ws_url,
            &mut self.preview.url_template,
            &mut self.app.default_prompt,
        ] {
            *value = expand_with(value, &lookup);
        }

        if let Some(url) = lookup(HTTP_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("{HTTP_URL_ENV} overrides server.http_url");
            self.server.http_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("{WS_URL_ENV} overrides server.ws_url");
            self.server.ws_url = url;
        }
        self
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

#[must_use]
pub fn kiln_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kiln"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    kiln_dir().map(|dir| dir.join("config.toml"))
}
