//! Command handlers for the polyrag CLI.
//!
//! Each command opens the pipeline from configuration, runs one operation
//! and closes the pipeline again.

pub mod add;
pub mod clear;
pub mod delete;
pub mod demo;
pub mod query;
pub mod stats;

pub use add::AddCommand;
pub use clear::ClearCommand;
pub use delete::DeleteCommand;
pub use demo::DemoCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;

use polyrag_core::AppResult;
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
