// SPDX-License-Identifier: MIT

//! OpenAI Model - Chat Completions API implementation

use super::{Content, GenerationConfig, Model, Part};
use crate::adk::error::{HubError, ModelError};
use crate::adk::http::{HttpOptions, RetryPolicy};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

/// OpenAI chat model implementation
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String, options: &HttpOptions) -> Result<Self, HubError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("openai".to_string()))?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: options.client()?,
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: options.retry.clone(),
        })
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> Value {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };
        json!({
            "role": role,
            "content": content.text()
        })
    }

    fn build_body(&self, history: &[Content], config: Option<&GenerationConfig>) -> Value {
        let messages: Vec<Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if cfg.json_output {
                body["response_format"] = json!({"type": "json_object"});
            }
        }
        body
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &Value) -> Result<Content, HubError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No choices in OpenAI response".into()))?;

        let message = &choice["message"];
        let mut parts = Vec::new();

        if let Some(reasoning) = message["reasoning_content"].as_str() {
            if !reasoning.is_empty() {
                parts.push(Part::Thinking(reasoning.to_string()));
            }
        }
        if let Some(content) = message["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text(content.to_string()));
            }
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, HubError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(history, config);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .retry
            .send("OpenAI", || {
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&body)
            })
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(ModelError::RateLimited {
                retry_after_secs: None,
            }
            .into());
        }
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(HubError::api("OpenAI", format!("{}: {}", status, text)));
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAIModel {
        OpenAIModel {
            client: Client::new(),
            api_key: "test".to_string(),
            model_name: "gpt-4.1".to_string(),
            base_url: "http://localhost".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_content_to_openai_roles() {
        let msg = OpenAIModel::content_to_openai_message(&Content::system("You are helpful"));
        assert_eq!(msg["role"], "system");
        assert_eq!(msg["content"], "You are helpful");

        let msg = OpenAIModel::content_to_openai_message(&Content::model("I can help"));
        assert_eq!(msg["role"], "assistant");
        assert_eq!(msg["content"], "I can help");
    }

    #[test]
    fn test_json_mode_body() {
        let config = GenerationConfig::with_temperature(0.2).json();
        let body = model().build_body(&[Content::user("Hi")], Some(&config));
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);

        let body = model().build_body(&[Content::user("Hi")], None);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_parse_openai_text_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hello, how can I help?"
                }
            }]
        });

        let content = OpenAIModel::parse_openai_response(&response).unwrap();
        assert_eq!(content.role, "model");
        assert_eq!(content.text(), "Hello, how can I help?");
    }

    #[test]
    fn test_parse_openai_without_choices() {
        let err = OpenAIModel::parse_openai_response(&json!({"error": "nope"})).unwrap_err();
        assert!(matches!(
            err,
            HubError::Model(ModelError::InvalidResponse(_))
        ));
    }
}
