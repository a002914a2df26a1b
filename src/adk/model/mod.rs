// SPDX-License-Identifier: MIT

//! Model module - defines the chat model trait and provider implementations
//!
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [openai] - OpenAI's Chat Completions API

pub mod anthropic;
pub mod openai;

use crate::adk::error::{HubError, ModelError};
use crate::adk::http::HttpOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// Ask the provider for a bare JSON object when it supports it
    #[serde(default)]
    pub json_output: bool,
}

impl GenerationConfig {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Self::default()
        }
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    /// One of `system`, `user`, `model`
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Reasoning content from thinking models, never shown to users
    Thinking(String),
}

impl Content {
    fn with_role(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::with_role("model", text)
    }

    /// Concatenated text parts, thinking excluded
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect()
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, HubError>;
}

/// Guess the provider from a model name
pub fn infer_provider_from_model(model_name: &str) -> &'static str {
    let name = model_name.to_ascii_lowercase();
    if name.starts_with("claude") {
        "anthropic"
    } else {
        "openai"
    }
}

/// Build a provider-backed model.
///
/// `provider` falls back to [`infer_provider_from_model`] when absent.
pub fn create_model(
    provider: Option<&str>,
    model_name: &str,
    options: &HttpOptions,
) -> Result<Arc<dyn Model>, HubError> {
    let provider = provider.unwrap_or_else(|| infer_provider_from_model(model_name));
    log::info!("Creating {} model '{}'", provider, model_name);

    match provider.to_ascii_lowercase().as_str() {
        "openai" => Ok(Arc::new(openai::OpenAIModel::new(
            model_name.to_string(),
            options,
        )?)),
        "anthropic" => Ok(Arc::new(anthropic::AnthropicModel::new(
            model_name.to_string(),
            options,
        )?)),
        other => Err(ModelError::UnsupportedProvider(other.to_string()).into()),
    }
}
