//! Ollama LLM provider implementation.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use polyrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Ollama LLM client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for http://localhost:11434.
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(),
        }
    }

    fn to_generate_request(&self, request: &LlmRequest) -> GenerateRequest {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        GenerateRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options,
            stream: false,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending generate request to Ollama");

        let body = self.to_generate_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(LlmResponse {
            content: parsed.response,
            model: parsed.model,
            usage: LlmUsage::new(
                parsed.prompt_eval_count.unwrap_or(0),
                parsed.eval_count.unwrap_or(0),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://localhost:11434/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "llama3")
            .with_system("Answer in French.")
            .with_temperature(0.7)
            .with_max_tokens(100);

        let body = client.to_generate_request(&request);
        assert_eq!(body.model, "llama3");
        assert_eq!(body.system.as_deref(), Some("Answer in French."));
        assert!(!body.stream);
        assert_eq!(
            body.options,
            Some(GenerateOptions {
                temperature: Some(0.7),
                num_predict: Some(100),
            })
        );
    }

    #[test]
    fn test_options_omitted_without_sampling_settings() {
        let client = OllamaClient::new();
        let body = client.to_generate_request(&LlmRequest::new("Hello", "llama3"));
        assert!(body.options.is_none());
    }
}
