//! Polyrag Core Library
//!
//! Foundational utilities shared by every polyrag crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RagSettings};
pub use error::{AppError, AppResult};
