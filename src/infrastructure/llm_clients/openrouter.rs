use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::{json, Value};

/// OpenAI-compatible chat completions client (OpenRouter, OpenAI, local servers)
pub struct OpenRouterClient {
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn api_key(config: &LLMConfig) -> Option<String> {
        config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
    }

    fn build_body(config: &LLMConfig, system: &str, user: &str) -> Value {
        json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        })
    }

    fn extract_content(json: &Value) -> Result<String> {
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }
}

#[async_trait]
impl LLMClient for OpenRouterClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let body = Self::build_body(config, system, user);

        let mut request = self.client.post(&url).json(&body);
        // Local servers usually run without a key
        if let Some(api_key) = Self::api_key(config) {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        Self::extract_content(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_carries_both_messages() {
        let config = LLMConfig {
            model: "openai/gpt-4o-mini".to_string(),
            ..LLMConfig::default()
        };
        let body = OpenRouterClient::build_body(&config, "sys", "hi");

        assert_eq!(body["model"], "openai/gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_extract_content() {
        let json = json!({"choices": [{"message": {"content": "[]"}}]});
        assert_eq!(OpenRouterClient::extract_content(&json).unwrap(), "[]");

        let bad = json!({"choices": []});
        assert!(matches!(
            OpenRouterClient::extract_content(&bad),
            Err(AppError::LLMError(_))
        ));
    }
}
