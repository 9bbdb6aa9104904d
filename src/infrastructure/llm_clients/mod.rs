pub mod gemini;
pub mod openrouter;

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::llm_config::LLMProvider;
use async_trait::async_trait;
use gemini::GeminiClient;
use openrouter::OpenRouterClient;
use serde_json::Value;

#[async_trait]
pub trait LLMClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String>;

    /// Generate text constrained to a JSON schema where the provider supports it
    async fn generate_structured(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        _schema: &Value,
    ) -> Result<String> {
        self.generate(config, system, user).await
    }
}

pub struct RouterClient {
    openrouter: OpenRouterClient,
    gemini: GeminiClient,
}

impl RouterClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            openrouter: OpenRouterClient::new(timeout_secs),
            gemini: GeminiClient::new(timeout_secs),
        }
    }
}

#[async_trait]
impl LLMClient for RouterClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        match config.provider {
            LLMProvider::Google => self.gemini.generate(config, system, user).await,
            _ => self.openrouter.generate(config, system, user).await,
        }
    }

    async fn generate_structured(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        schema: &Value,
    ) -> Result<String> {
        match config.provider {
            LLMProvider::Google => {
                self.gemini
                    .generate_structured(config, system, user, schema)
                    .await
            }
            _ => {
                self.openrouter
                    .generate_structured(config, system, user, schema)
                    .await
            }
        }
    }
}
