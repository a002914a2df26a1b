//! Anthropic Model - Claude Messages API implementation

use super::{Content, GenerationConfig, Model, Part};
use crate::adk::error::{HubError, ModelError};
use crate::adk::http::{HttpOptions, RetryPolicy};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

/// Anthropic Claude model implementation
pub struct AnthropicModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    retry: RetryPolicy,
}

impl AnthropicModel {
    /// Create a new AnthropicModel
    ///
    /// Requires `ANTHROPIC_API_KEY` environment variable to be set.
    /// Optionally uses `ANTHROPIC_BASE_URL` for custom endpoints.
    pub fn new(model_name: String, options: &HttpOptions) -> Result<Self, HubError> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("anthropic".to_string()))?;
        let base_url = env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1".to_string());

        Ok(Self {
            client: options.client()?,
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: options.retry.clone(),
        })
    }

    /// Join every system turn into the top-level system prompt
    fn extract_system_message(history: &[Content]) -> Option<String> {
        let system: Vec<String> = history
            .iter()
            .filter(|c| c.role == "system")
            .map(Content::text)
            .filter(|t| !t.is_empty())
            .collect();
        if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        }
    }

    /// Convert internal Content to Anthropic message format
    fn content_to_anthropic_message(content: &Content) -> Option<Value> {
        // Skip system messages (handled separately)
        if content.role == "system" {
            return None;
        }

        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        // Thinking blocks cannot be replayed without their signature
        let blocks: Vec<Value> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(t) if !t.is_empty() => Some(json!({"type": "text", "text": t})),
                _ => None,
            })
            .collect();

        if blocks.is_empty() {
            return None;
        }

        Some(json!({
            "role": role,
            "content": blocks
        }))
    }

    /// Parse Anthropic response into Content
    fn parse_anthropic_response(response: &Value) -> Result<Content, HubError> {
        let content_blocks = response["content"].as_array().ok_or_else(|| {
            ModelError::InvalidResponse("No content in Anthropic response".into())
        })?;

        let mut parts = Vec::new();

        for block in content_blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        if !text.is_empty() {
                            parts.push(Part::Text(text.to_string()));
                        }
                    }
                }
                Some("thinking") => {
                    if let Some(thinking) = block["thinking"].as_str() {
                        if !thinking.is_empty() {
                            parts.push(Part::Thinking(thinking.to_string()));
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(stop_reason) = response["stop_reason"].as_str() {
            log::debug!("Anthropic stop reason: {}", stop_reason);
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for AnthropicModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, HubError> {
        let url = format!("{}/messages", self.base_url);

        let messages: Vec<Value> = history
            .iter()
            .filter_map(Self::content_to_anthropic_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "max_tokens": config.and_then(|c| c.max_output_tokens).unwrap_or(4096)
        });

        if let Some(sys) = Self::extract_system_message(history) {
            body["system"] = json!(sys);
        }

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        log::debug!(
            "Anthropic request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .retry
            .send("Anthropic", || {
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
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
            return Err(HubError::api("Anthropic", format!("{}: {}", status, text)));
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("Anthropic response: {}", resp_json);

        Self::parse_anthropic_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_system_message_joins_turns() {
        let history = vec![
            Content::system("You are helpful"),
            Content::user("Hello"),
            Content::system("Answer briefly"),
        ];

        let system = AnthropicModel::extract_system_message(&history);
        assert_eq!(
            system,
            Some("You are helpful\n\nAnswer briefly".to_string())
        );
        assert_eq!(
            AnthropicModel::extract_system_message(&[Content::user("x")]),
            None
        );
    }

    #[test]
    fn test_content_to_anthropic_messages() {
        let msg = AnthropicModel::content_to_anthropic_message(&Content::user("Hello")).unwrap();
        assert_eq!(msg["role"], "user");
        assert_eq!(msg["content"][0]["type"], "text");
        assert_eq!(msg["content"][0]["text"], "Hello");

        let msg =
            AnthropicModel::content_to_anthropic_message(&Content::model("I can help")).unwrap();
        assert_eq!(msg["role"], "assistant");

        assert!(AnthropicModel::content_to_anthropic_message(&Content::system("x")).is_none());
    }

    #[test]
    fn test_thinking_only_turn_is_dropped() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![Part::Thinking("private".to_string())],
        };
        assert!(AnthropicModel::content_to_anthropic_message(&content).is_none());
    }

    #[test]
    fn test_parse_anthropic_thinking_response() {
        let response = json!({
            "content": [
                {"type": "thinking", "thinking": "Let me think about this..."},
                {"type": "text", "text": "The answer is 42"}
            ],
            "stop_reason": "end_turn"
        });

        let content = AnthropicModel::parse_anthropic_response(&response).unwrap();
        assert_eq!(content.parts.len(), 2);
        assert!(matches!(&content.parts[0], Part::Thinking(t) if t == "Let me think about this..."));
        assert_eq!(content.text(), "The answer is 42");
    }

    #[test]
    fn test_parse_anthropic_missing_content() {
        assert!(AnthropicModel::parse_anthropic_response(&json!({})).is_err());
    }
}
