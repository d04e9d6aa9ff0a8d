//! OpenAI client configuration.

use crate::error::{AmplonError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "OPEN_AI_KEY"];

/// Look up the OpenAI API key from the environment.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|key| !key.trim().is_empty())
}

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
///
/// `async-openai` only reads `OPENAI_API_KEY`, so the legacy `OPEN_AI_KEY`
/// name is resolved here and passed explicitly.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AmplonError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new();
    if let Some(key) = api_key_from_env() {
        config = config.with_api_key(key);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
