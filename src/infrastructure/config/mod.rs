// ============================================================
// CONFIGURATION
// ============================================================
// Layered settings: built-in defaults, then `datatoy.toml`, then
// `DATATOY_` environment variables (`__` separates sections).
// The LLM API key may also come from well-known variables or the
// OS keyring.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::error::Result;
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use crate::infrastructure::security::keyring::KeyringManager;

pub const CONFIG_FILE: &str = "datatoy.toml";
pub const ENV_PREFIX: &str = "DATATOY_";
pub const KEYRING_SERVICE: &str = "DataToy";

/// Variables consulted for the API key when none is configured
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,

    #[validate(nested)]
    pub llm: LLMConfig,
}

impl AppConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate settings without touching the API key fallbacks
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Full startup load: `.env`, layered settings, then API key fallbacks
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let mut config = Self::from_figment(Self::figment())?;
        let keyring = ConfigService::new();
        config.resolve_api_key(|name| std::env::var(name).ok(), |provider| {
            keyring.get_api_key(provider)
        });

        tracing::info!(
            provider = ?config.llm.provider,
            model = %config.llm.model,
            has_api_key = config.llm.has_api_key(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Fill a missing API key from the environment, then from the keyring
    pub fn resolve_api_key<E, K>(&mut self, env: E, keyring: K)
    where
        E: Fn(&str) -> Option<String>,
        K: Fn(&str) -> Option<String>,
    {
        if self.llm.has_api_key() {
            return;
        }

        let from_env = API_KEY_VARS
            .iter()
            .filter_map(|&name| env(name))
            .find(|key| !key.trim().is_empty());

        self.llm.api_key = from_env.or_else(|| keyring(provider_key(self.llm.provider)));
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

/// Keyring entry name for a provider's API key
pub fn provider_key(provider: LLMProvider) -> &'static str {
    match provider {
        LLMProvider::Local => "local",
        LLMProvider::OpenAI => "openai",
        LLMProvider::OpenRouter => "openrouter",
        LLMProvider::Google => "google",
    }
}

/// API keys kept in the OS keyring
pub struct ConfigService {
    keyring: KeyringManager,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    pub fn save_api_key(&self, provider: &str, key: &str) -> Result<()> {
        self.keyring.set_secret(provider, key)
    }

    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.keyring.find_secret(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AppError;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = AppConfig::from_figment(AppConfig::figment()).unwrap();
            assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 3001));
            assert_eq!(config.llm.provider, LLMProvider::Google);
            assert_eq!(config.llm.model, "gemini-2.0-flash");
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [server]
                port = 4000

                [llm]
                provider = "OpenRouter"
                base_url = "https://openrouter.ai/api/v1"
                model = "openai/gpt-4o-mini"
                "#,
            )?;
            jail.set_env("DATATOY_SERVER__PORT", "4100");
            jail.set_env("DATATOY_LLM__API_KEY", "from-env");

            let config = AppConfig::from_figment(AppConfig::figment()).unwrap();
            assert_eq!(config.server.port, 4100);
            assert_eq!(config.server.host, "127.0.0.1");
            assert_eq!(config.llm.provider, LLMProvider::OpenRouter);
            assert_eq!(config.llm.model, "openai/gpt-4o-mini");
            assert_eq!(config.llm.api_key.as_deref(), Some("from-env"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("DATATOY_LLM__TEMPERATURE", "5.0");

            let err = AppConfig::from_figment(AppConfig::figment()).unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
            Ok(())
        });
    }

    #[test]
    fn test_api_key_fallback_order() {
        let env = |name: &str| match name {
            "API_KEY" => Some("generic".to_string()),
            "GEMINI_API_KEY" => Some(" ".to_string()),
            _ => None,
        };
        let no_keyring = |_: &str| -> Option<String> { None };

        let mut config = AppConfig::default();
        config.resolve_api_key(env, no_keyring);
        assert_eq!(config.llm.api_key.as_deref(), Some("generic"));

        let mut config = AppConfig::default();
        config.resolve_api_key(|_| None, |provider| Some(format!("{}-secret", provider)));
        assert_eq!(config.llm.api_key.as_deref(), Some("google-secret"));

        let mut config = AppConfig::default();
        config.llm.api_key = Some("configured".to_string());
        config.resolve_api_key(env, no_keyring);
        assert_eq!(config.llm.api_key.as_deref(), Some("configured"));
    }
}
