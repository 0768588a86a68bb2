//! Provider identifiers for text generation.

/// Generation provider enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Cohere,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cohere" => Some(Self::Cohere),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cohere => "cohere",
            Self::Ollama => "ollama",
        }
    }

    /// Whether this provider needs an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Cohere)
    }
}
