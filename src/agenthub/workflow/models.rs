// SPDX-License-Identifier: MIT

//! Model handles for the workflow's three roles

use crate::adk::error::{HubError, ModelError};
use crate::adk::model::{create_model, Content, GenerationConfig, Model};
use crate::agenthub::config::Settings;
use std::sync::Arc;

/// A model bound to the generation settings of one role
#[derive(Clone)]
pub struct ModelRole {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

impl ModelRole {
    pub fn new(model: Arc<dyn Model>, temperature: f32) -> Self {
        Self {
            model,
            config: GenerationConfig::with_temperature(temperature),
        }
    }

    /// Same model, asking the provider for JSON output
    pub fn json(&self) -> Self {
        Self {
            model: self.model.clone(),
            config: self.config.clone().json(),
        }
    }

    /// Send the messages and return the reply text; empty replies are errors
    pub async fn complete(&self, messages: &[Content]) -> Result<String, HubError> {
        let reply = self
            .model
            .generate_content(messages, Some(&self.config))
            .await?;
        let text = reply.text();
        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse.into());
        }
        Ok(text)
    }
}

/// Main (classifier + replies), code and document models
#[derive(Clone)]
pub struct Models {
    pub main: ModelRole,
    pub code: ModelRole,
    pub document: ModelRole,
}

impl Models {
    pub fn from_settings(settings: &Settings) -> Result<Self, HubError> {
        let options = settings.http_options();
        let provider = settings.provider.as_deref();
        let build = |name: &str, temperature: f32| -> Result<ModelRole, HubError> {
            Ok(ModelRole::new(
                create_model(provider, name, &options)?,
                temperature,
            ))
        };

        Ok(Self {
            main: build(&settings.main_model.name, settings.main_model.temperature)?,
            code: build(&settings.code_model.name, settings.code_model.temperature)?,
            document: build(
                &settings.document_model.name,
                settings.document_model.temperature,
            )?,
        })
    }

    /// One model serving every role
    pub fn uniform(model: Arc<dyn Model>, temperature: f32) -> Self {
        let role = ModelRole::new(model, temperature);
        Self {
            main: role.clone(),
            code: role.clone(),
            document: role,
        }
    }
}
