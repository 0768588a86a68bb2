//! Embedding providers.
//!
//! Documents and questions are embedded by the same model but in different
//! modes, so providers expose both directions.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{CohereEmbedder, MockProvider};
