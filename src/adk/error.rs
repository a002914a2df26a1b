// SPDX-License-Identifier: MIT

//! Typed error handling for agenthub-rs
//!
//! Every fallible path in the crate returns [`HubError`]. The HTTP layer
//! maps each variant onto a status code and a stable error code string.

use thiserror::Error;

/// Top-level error type for agenthub-rs
#[derive(Debug, Error)]
pub enum HubError {
    /// API errors from external services (LLM providers, web search service)
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Tool not found in the registry
    #[error("Tool '{name}' not found")]
    ToolNotFound { name: String },

    /// Configuration errors (missing env vars, invalid config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model/LLM errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Workflow-specific errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Request validation failures
    #[error("{0}")]
    Validation(String),

    #[error("Chat with ID {0} not found")]
    ChatNotFound(String),

    #[error("No content found for '{0}'")]
    ContentNotFound(String),

    #[error("Document with ID {0} not found")]
    DocumentNotFound(String),

    /// Uploaded file could not be accepted or read
    #[error("{0}")]
    FileProcessing(String),

    #[error("File size exceeds maximum limit of {limit_bytes} bytes")]
    FileTooLarge { limit_bytes: u64 },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Workflow-specific errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The final reply could not be produced
    #[error("Response generation failed: {0}")]
    ResponseGeneration(String),

    /// A stage ran against a state it cannot handle
    #[error("Invalid state for {stage}: {reason}")]
    InvalidState { stage: String, reason: String },

    #[error("Empty query")]
    EmptyQuery,

    /// Document processing requested with nothing attached
    #[error("No documents attached to the message")]
    NoDocuments,
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Unknown model provider: {0}")]
    UnsupportedProvider(String),

    /// Rate limit still exceeded after retries
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl HubError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for HubError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for HubError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
