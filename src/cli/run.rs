//! Run a script against JSON input

use serde_json::Value as JsonValue;

use super::CliError;
use crate::context::{LogEntry, LogSink};
use crate::fetcher::JsonPathFetcher;
use crate::script::{ExecutionOptions, ScriptEngine, ScriptSettings};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Script text (a JSON array of commands)
    pub script: String,
    /// JSON input document
    pub input: Option<String>,
    /// Treat unknown commands as warnings
    pub allow_unknown: bool,
    /// Halt at the first command that fails its own validation
    pub stop_on_error: bool,
}

/// Result of a run
#[derive(Debug)]
pub struct RunOutcome {
    pub document: JsonValue,
    pub success: bool,
    pub log_entries: Vec<LogEntry>,
}

/// Parse the script and input, then execute
pub fn execute_run(options: &RunOptions, sink: &dyn LogSink) -> Result<RunOutcome, CliError> {
    let engine = ScriptEngine::new(ScriptSettings {
        allow_unknown_commands: options.allow_unknown,
        stop_on_error: options.stop_on_error,
    });

    // Fail on the script before touching the input.
    let script = engine.parse(&options.script).map_err(CliError::Invalid)?;
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let document: JsonValue = serde_json::from_str(input)?;

    let result = script.execute_with(
        document,
        &ExecutionOptions {
            fetcher: Some(&JsonPathFetcher),
            sink: Some(sink),
            stop_on_error: options.stop_on_error,
        },
    );
    Ok(RunOutcome {
        document: result.document,
        success: result.success,
        log_entries: result.log_entries,
    })
}
