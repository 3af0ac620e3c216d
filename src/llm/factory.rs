use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{GeminiClient, OpenAIClient};
use crate::config::{missing_key_message, LlmConfig, Provider};

/// Create an LLM client from config. The API key is read here, once; a missing
/// key is not fatal at startup, every call then fails with a configuration error.
pub fn create_client(llm_config: &LlmConfig, dry_run: bool) -> Result<Arc<dyn LlmClient>> {
    if dry_run {
        return Ok(Arc::new(MockLlmClient::new()));
    }

    let api_key_env = llm_config.api_key_env_name().to_string();
    let api_key = llm_config.api_key();
    if api_key.is_none() {
        warn!(
            "No usable API key ({}); generation requests will fail",
            missing_key_message(&api_key_env)
        );
    }

    let base_url = llm_config.resolved_base_url();
    let model = llm_config.model.clone();
    let timeout = llm_config.timeout_secs;

    let client: Arc<dyn LlmClient> = match llm_config.provider {
        Provider::Gemini => Arc::new(
            GeminiClient::new(api_key, api_key_env, model, base_url, timeout)
                .context("failed to create Gemini client")?,
        ),
        Provider::OpenAI | Provider::OpenAICompatible => Arc::new(
            OpenAIClient::new(api_key, api_key_env, model, base_url, timeout)
                .context("failed to create OpenAI client")?,
        ),
    };
    Ok(client)
}
