//! LLM provider factory.
//!
//! Builds a generation client from the configured provider name, endpoint and
//! API key.

use crate::client::LlmClient;
use crate::providers::{CohereClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("cohere", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by Cohere
///
/// # Errors
/// Returns error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    let key = match api_key {
        Some(key) => key,
        None if provider_type.requires_api_key() => {
            return Err(format!(
                "Provider '{}' requires API key",
                provider_type.as_str()
            ));
        }
        None => "",
    };

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::Cohere => {
            let client = match endpoint {
                Some(url) => CohereClient::with_base_url(key, url),
                None => CohereClient::new(key),
            };
            Ok(Arc::new(client))
        }
    }
}
