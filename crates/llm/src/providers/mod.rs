//! Concrete LLM provider implementations.

pub mod cohere;
pub mod ollama;

pub use cohere::CohereClient;
pub use ollama::OllamaClient;
