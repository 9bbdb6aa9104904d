use std::sync::Arc;

use actix_web::web;
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::interpret::LlmInterpreter;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::llm_clients::RouterClient;
use crate::interfaces::http::{start_server, HttpState};

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load configuration and serve the HTTP API until shutdown
pub async fn run() -> std::io::Result<()> {
    init_tracing();

    let config = AppConfig::load().map_err(to_io_error)?;
    if !config.llm.has_api_key() {
        tracing::warn!("No API key configured; cleaning requests will fail until one is set");
    }

    let llm_client = Arc::new(RouterClient::new(config.llm.timeout_secs));
    let gateway = Arc::new(LlmInterpreter::new(llm_client, config.llm.clone()));
    let state = web::Data::new(HttpState::new(gateway));

    let (host, port) = config.bind_address();
    start_server(state, &host, port)?.await
}

/// Store an API key for `provider` in the OS keyring
pub fn store_api_key(provider: &str, key: &str) -> Result<()> {
    init_tracing();
    if key.trim().is_empty() {
        return Err(AppError::ValidationError("API key must not be empty".to_string()));
    }

    ConfigService::new().save_api_key(provider, key.trim())?;
    tracing::info!(provider, "Stored API key in keyring");
    Ok(())
}

fn to_io_error(err: AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
}
