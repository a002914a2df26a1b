// SPDX-License-Identifier: MIT

//! Service settings
//!
//! Layered as defaults, then an optional YAML file, then environment
//! variables.

use crate::adk::error::HubError;
use crate::adk::http::{HttpOptions, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Model name plus its sampling temperature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    pub name: String,
    pub temperature: f32,
}

impl ModelSettings {
    fn new(name: &str, temperature: f32) -> Self {
        Self {
            name: name.to_string(),
            temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Allowed browser origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// `openai` or `anthropic`; inferred from model names when unset
    pub provider: Option<String>,
    pub main_model: ModelSettings,
    pub code_model: ModelSettings,
    pub document_model: ModelSettings,
    pub content_dir: PathBuf,
    pub upload_dir: PathBuf,
    /// Per-file limit for uploads and chat attachments
    pub max_upload_bytes: u64,
    /// Files accepted on one chat message
    pub max_attachments: usize,
    pub websearch_url: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub search_k: usize,
    /// Chat turns replayed into the workflow transcript
    pub history_window: usize,
    pub http_timeout_secs: u64,
    pub retry_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string()],
            provider: None,
            main_model: ModelSettings::new("gpt-4.1", 0.7),
            code_model: ModelSettings::new("gpt-4.1", 0.2),
            document_model: ModelSettings::new("gpt-4.1", 0.7),
            content_dir: PathBuf::from("generated_content"),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            max_attachments: 5,
            websearch_url: None,
            chunk_size: 1000,
            chunk_overlap: 200,
            search_k: 4,
            history_window: 10,
            http_timeout_secs: 120,
            retry_attempts: 3,
        }
    }
}

impl Settings {
    /// Defaults, then `path` when given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, HubError> {
        let mut settings = match path {
            Some(p) => {
                log::info!("Loading settings from {}", p.display());
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    HubError::config(format!("cannot read {}: {}", p.display(), e))
                })?;
                Self::from_yaml_str(&raw)?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, HubError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), HubError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty("AGENTHUB_HOST") {
            self.host = host;
        }
        if let Some(port) = non_empty("AGENTHUB_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| HubError::config(format!("AGENTHUB_PORT is not a port: {}", port)))?;
        }
        if let Some(provider) = non_empty("MODEL_PROVIDER") {
            self.provider = Some(provider.to_ascii_lowercase());
        }
        if let Some(name) = non_empty("AGENTHUB_MAIN_MODEL") {
            self.main_model.name = name;
        }
        if let Some(name) = non_empty("AGENTHUB_CODE_MODEL") {
            self.code_model.name = name;
        }
        if let Some(name) = non_empty("AGENTHUB_DOCUMENT_MODEL") {
            self.document_model.name = name;
        }
        if let Some(dir) = non_empty("AGENTHUB_CONTENT_DIR") {
            self.content_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("AGENTHUB_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty("WEBSEARCH_SERVICE_URL") {
            self.websearch_url = Some(url);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), HubError> {
        if self.chunk_size == 0 {
            return Err(HubError::config("chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(HubError::config(
                "chunk_overlap must be smaller than chunk_size",
            ));
        }
        if self.search_k == 0 {
            return Err(HubError::config("search_k must be positive"));
        }
        if self.retry_attempts == 0 {
            return Err(HubError::config("retry_attempts must be at least 1"));
        }
        if self.max_attachments == 0 {
            return Err(HubError::config("max_attachments must be at least 1"));
        }
        let host = self.host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(HubError::config(format!("invalid host '{}'", self.host)));
        }
        self.websearch_url()?;
        Ok(())
    }

    pub fn websearch_url(&self) -> Result<Option<Url>, HubError> {
        self.websearch_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| HubError::config(format!("invalid websearch_url '{}': {}", raw, e)))
            })
            .transpose()
    }

    /// Resolve `host` (an IP literal or a hostname) to a listen address
    pub async fn addr(&self) -> Result<SocketAddr, HubError> {
        let host = self.host.trim();
        tokio::net::lookup_host((host, self.port))
            .await
            .map_err(|e| HubError::config(format!("cannot resolve host '{}': {}", host, e)))?
            .next()
            .ok_or_else(|| HubError::config(format!("host '{}' has no addresses", host)))
    }

    /// Largest request body: every attachment at the per-file limit
    pub fn max_request_bytes(&self) -> u64 {
        self.max_upload_bytes
            .saturating_mul(self.max_attachments as u64)
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.http_timeout_secs),
            retry: RetryPolicy::new(self.retry_attempts),
        }
    }
}
