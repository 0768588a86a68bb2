//! LLM integration crate for polyrag.
//!
//! Provides a provider-agnostic abstraction over chat/completion services used
//! to turn retrieved context into an answer.
//!
//! # Providers
//! - **Cohere**: hosted chat API (default)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use polyrag_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{CohereClient, OllamaClient};
pub use types::ProviderType;
