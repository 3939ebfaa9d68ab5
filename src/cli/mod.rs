//! CLI support for clove-script
//!
//! Provides programmatic access to the CLI operations so they can be embedded
//! in other tools.

mod commands;
mod run;
mod validate;

pub use commands::get_command_listing;
pub use run::{RunOptions, RunOutcome, execute_run};
pub use validate::{execute_validate, format_issues};

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::validation::ValidationResult;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Script failed to parse
    #[error("Script is invalid:\n{}", format_issues(.0))]
    Invalid(ValidationResult),

    /// A run finished unsuccessfully
    #[error("Script run failed")]
    RunFailed,

    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No input provided
    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}

/// Loads script text: an argument starting with `[` is the script itself,
/// anything else is a file to read.
pub fn load_script(argument: &str) -> Result<String, CliError> {
    if argument.trim_start().starts_with('[') {
        Ok(argument.to_string())
    } else {
        Ok(std::fs::read_to_string(Path::new(argument))?)
    }
}
