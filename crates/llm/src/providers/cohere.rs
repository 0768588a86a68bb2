//! Cohere chat provider.
//!
//! Uses the v1 chat endpoint: the user prompt is sent as `message` and the
//! system prompt as `preamble`.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use polyrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Cohere API base URL.
pub const DEFAULT_COHERE_URL: &str = "https://api.cohere.com";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
    #[serde(default)]
    meta: Option<ChatMeta>,
}

#[derive(Debug, Deserialize)]
struct ChatMeta {
    #[serde(default)]
    billed_units: Option<BilledUnits>,
}

#[derive(Debug, Deserialize)]
struct BilledUnits {
    #[serde(default)]
    input_tokens: Option<f64>,
    #[serde(default)]
    output_tokens: Option<f64>,
}

/// Request timeout for chat calls; generation can be slow on long contexts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Cohere chat client.
pub struct CohereClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl CohereClient {
    /// Create a client against the public Cohere API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_COHERE_URL)
    }

    /// Create a client with a custom base URL (proxy or test server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(),
        }
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &request.model,
            message: &request.prompt,
            preamble: request.system.as_deref(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

fn usage_from_meta(meta: Option<ChatMeta>) -> LlmUsage {
    let units = meta.and_then(|m| m.billed_units);
    match units {
        Some(units) => LlmUsage::new(
            units.input_tokens.unwrap_or(0.0) as u32,
            units.output_tokens.unwrap_or(0.0) as u32,
        ),
        None => LlmUsage::default(),
    }
}

#[async_trait::async_trait]
impl LlmClient for CohereClient {
    fn provider_name(&self) -> &str {
        "cohere"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending chat request to Cohere");

        let url = format!("{}/v1/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Cohere: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Cohere API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Cohere response: {}", e)))?;

        Ok(LlmResponse {
            content: parsed.text,
            model: request.model.clone(),
            usage: usage_from_meta(parsed.meta),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_maps_system_to_preamble() {
        let client = CohereClient::new("key");
        let request = LlmRequest::new("Question?", "command-r-08-2024").with_system("Be concise.");

        let json = serde_json::to_value(client.to_chat_request(&request)).unwrap();
        assert_eq!(json["message"], "Question?");
        assert_eq!(json["preamble"], "Be concise.");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_parse_chat_response_with_usage() {
        let body = r#"{"text":"Paris.","generation_id":"g1","meta":{"billed_units":{"input_tokens":12,"output_tokens":3}}}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text, "Paris.");
        assert_eq!(usage_from_meta(parsed.meta), LlmUsage::new(12, 3));
    }

    #[test]
    fn test_parse_chat_response_without_meta() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"text":"ok"}"#).unwrap();
        assert_eq!(usage_from_meta(parsed.meta), LlmUsage::default());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = CohereClient::with_base_url("key", "http://localhost:9000/");
        assert_eq!(client.base_url, "http://localhost:9000");
    }
}
