//! Scripts: parsing script text into commands and running them in order.
//!
//! ```
//! use clove_script::ScriptEngine;
//! use serde_json::json;
//!
//! let engine = ScriptEngine::default();
//! let script = r#"[{"command": "add", "path": "$.obj.newProp", "value": "x"}]"#;
//! let result = engine.run(script, json!({"obj": {}}));
//! assert!(result.success);
//! assert_eq!(result.document, json!({"obj": {"newProp": "x"}}));
//! ```

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::command::{Command, CommandDefinition, CommandRegistry, CommandResult};
use crate::context::{ExecutionContext, LogCrateSink, LogEntry, LogSink};
use crate::error::EngineError;
use crate::fetcher::{ItemFetcher, JsonPathFetcher};
use crate::functions::FunctionRegistry;
use crate::validation::{ValidationIssue, ValidationResult, codes, pointer};

const COMMAND_PROPERTY: &str = "command";
const ENGINE_GROUP: &str = "script";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptSettings {
    /// Unknown command names are warnings (and skipped) instead of errors.
    pub allow_unknown_commands: bool,
    /// Halt at the first command that fails its own validation.
    pub stop_on_error: bool,
}

/// Collaborators for one run. A missing fetcher is fatal; a missing sink
/// just means entries are only kept in the result.
#[derive(Clone, Copy, Default)]
pub struct ExecutionOptions<'a> {
    pub fetcher: Option<&'a dyn ItemFetcher>,
    pub sink: Option<&'a dyn LogSink>,
    pub stop_on_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// False only when the run could not happen at all, or was halted by
    /// `stop_on_error`.
    pub success: bool,
    pub document: JsonValue,
    pub log_entries: Vec<LogEntry>,
    /// One entry per command that executed.
    pub commands: Vec<CommandResult>,
}

struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _entry: &LogEntry) {}
}

/// An ordered, parsed command list. Immutable once built; run it as often as
/// needed.
#[derive(Debug)]
pub struct Script {
    commands: Vec<(usize, Box<dyn Command>)>,
    validation: ValidationResult,
    stop_on_error: bool,
}

impl Script {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|(_, command)| command.name())
    }

    /// Issues collected while parsing: warnings, plus whatever the commands
    /// report about themselves. Those are checked again on every run.
    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    /// Runs with the bundled fetcher, logging through the `log` crate.
    pub fn execute(&self, document: JsonValue) -> ExecutionResult {
        self.execute_with(
            document,
            &ExecutionOptions {
                fetcher: Some(&JsonPathFetcher),
                sink: Some(&LogCrateSink),
                stop_on_error: self.stop_on_error,
            },
        )
    }

    pub fn execute_with(&self, mut document: JsonValue, options: &ExecutionOptions<'_>) -> ExecutionResult {
        let sink = options.sink.unwrap_or(&NullSink);
        let Some(fetcher) = options.fetcher else {
            let mut ctx = ExecutionContext::new(&JsonPathFetcher, sink);
            ctx.error(ENGINE_GROUP, EngineError::MissingFetcher.to_string());
            return ExecutionResult {
                success: false,
                document,
                log_entries: ctx.into_entries(),
                commands: Vec::new(),
            };
        };

        let mut ctx = ExecutionContext::new(fetcher, sink);
        let mut results = Vec::with_capacity(self.commands.len());
        let mut success = true;
        ctx.debug(ENGINE_GROUP, format!("running {} command(s)", self.commands.len()));

        for (index, command) in &self.commands {
            let issues = command.validate();
            for issue in issues.iter().filter(|issue| !issue.is_error()) {
                ctx.warn(command.name(), located(*index, issue).to_string());
            }
            let errors: Vec<_> = issues.iter().filter(|issue| issue.is_error()).collect();
            if !errors.is_empty() {
                for issue in &errors {
                    ctx.error(command.name(), located(*index, issue).to_string());
                }
                if options.stop_on_error {
                    ctx.error(ENGINE_GROUP, format!("stopped at command {}", index));
                    success = false;
                    break;
                }
                ctx.warn(ENGINE_GROUP, format!("command {} skipped", index));
                continue;
            }

            ctx.debug(command.name(), format!("command {}", index));
            results.push(command.execute(&mut document, &mut ctx));
        }

        ExecutionResult {
            success,
            document,
            log_entries: ctx.into_entries(),
            commands: results,
        }
    }
}

/// Rebases a command-relative issue location onto the script.
fn located(index: usize, issue: &ValidationIssue) -> ValidationIssue {
    ValidationIssue {
        location: format!("{}{}", pointer([index]), issue.location),
        ..issue.clone()
    }
    .at_command(index)
}

/// Parses and runs scripts against a pair of registries.
pub struct ScriptEngine {
    commands: CommandRegistry,
    functions: FunctionRegistry,
    settings: ScriptSettings,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        ScriptEngine::new(ScriptSettings::default())
    }
}

impl ScriptEngine {
    pub fn new(settings: ScriptSettings) -> Self {
        Self::with_registries(CommandRegistry::default(), FunctionRegistry::default(), settings)
    }

    pub fn with_registries(commands: CommandRegistry, functions: FunctionRegistry, settings: ScriptSettings) -> Self {
        ScriptEngine {
            commands,
            functions,
            settings,
        }
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn settings(&self) -> &ScriptSettings {
        &self.settings
    }

    /// Parses script text. Fails with every issue found when the script or
    /// any command definition has an error. Errors a built command reports
    /// about itself are kept in [`Script::validation`] instead, and the run
    /// skips that command.
    pub fn parse(&self, text: &str) -> Result<Script, ValidationResult> {
        match serde_json::from_str::<JsonValue>(text) {
            Ok(script) => self.parse_value(&script),
            Err(e) => {
                let mut result = ValidationResult::default();
                result.push(ValidationIssue::error(
                    codes::SCRIPT_INVALID_JSON,
                    format!("script is not valid JSON: {}", e),
                    "",
                ));
                Err(result)
            }
        }
    }

    pub fn parse_value(&self, script: &JsonValue) -> Result<Script, ValidationResult> {
        let mut validation = ValidationResult::default();
        let Some(items) = script.as_array() else {
            validation.push(ValidationIssue::error(
                codes::SCRIPT_NOT_ARRAY,
                "a script must be a JSON array of commands",
                "",
            ));
            return Err(validation);
        };

        let mut commands = Vec::with_capacity(items.len());
        let mut definitions_ok = true;
        for (index, item) in items.iter().enumerate() {
            let mut issues = Vec::new();
            let command = self.parse_command(index, item, &mut issues);
            definitions_ok &= !issues.iter().any(ValidationIssue::is_error);
            validation.issues.extend(issues);
            if let Some(command) = command {
                validation
                    .issues
                    .extend(command.validate().iter().map(|issue| located(index, issue)));
                commands.push((index, command));
            }
        }

        if definitions_ok {
            Ok(Script {
                commands,
                validation,
                stop_on_error: self.settings.stop_on_error,
            })
        } else {
            Err(validation)
        }
    }

    fn parse_command(
        &self,
        index: usize,
        item: &JsonValue,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Box<dyn Command>> {
        let Some(properties) = item.as_object() else {
            issues.push(
                ValidationIssue::error(codes::COMMAND_NOT_OBJECT, "a command must be a JSON object", pointer([index]))
                    .at_command(index),
            );
            return None;
        };

        let location = pointer([index.to_string(), COMMAND_PROPERTY.to_string()]);
        let Some(name) = properties.get(COMMAND_PROPERTY).and_then(JsonValue::as_str) else {
            issues.push(
                ValidationIssue::error(
                    codes::COMMAND_MISSING_NAME,
                    "a command needs a 'command' string",
                    location,
                )
                .at_command(index),
            );
            return None;
        };

        let Some(factory) = self.commands.get(name) else {
            let message = format!("unknown command '{}'", name);
            let issue = if self.settings.allow_unknown_commands {
                ValidationIssue::warning(codes::COMMAND_UNKNOWN, message, location)
            } else {
                ValidationIssue::error(codes::COMMAND_UNKNOWN, message, location)
            };
            issues.push(issue.at_command(index));
            return None;
        };

        let definition = CommandDefinition {
            index,
            name,
            properties,
            functions: &self.functions,
        };
        factory(&definition, issues)
    }

    /// Parses without running. Includes each command's own checks, so a
    /// script that would skip a command at run time does not validate.
    pub fn validate(&self, text: &str) -> ValidationResult {
        match self.parse(text) {
            Ok(script) => script.validation,
            Err(result) => result,
        }
    }

    /// Parses and runs in one go. A script that doesn't parse leaves the
    /// document untouched and reports each issue as an error entry.
    pub fn run(&self, text: &str, document: JsonValue) -> ExecutionResult {
        self.run_with(text, document, &LogCrateSink)
    }

    pub fn run_with(&self, text: &str, document: JsonValue, sink: &dyn LogSink) -> ExecutionResult {
        match self.parse(text) {
            Ok(script) => script.execute_with(
                document,
                &ExecutionOptions {
                    fetcher: Some(&JsonPathFetcher),
                    sink: Some(sink),
                    stop_on_error: self.settings.stop_on_error,
                },
            ),
            Err(validation) => {
                let mut ctx = ExecutionContext::new(&JsonPathFetcher, sink);
                for issue in &validation.issues {
                    ctx.error(ENGINE_GROUP, issue.to_string());
                }
                let errors = validation.errors().count();
                ctx.error(ENGINE_GROUP, EngineError::InvalidScript(errors).to_string());
                ExecutionResult {
                    success: false,
                    document,
                    log_entries: ctx.into_entries(),
                    commands: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_located_issue() {
        let issue = ValidationIssue::error(codes::PATH_INVALID, "bad", "/path");
        let issue = located(3, &issue);
        assert_eq!(issue.location, "/3/path");
        assert_eq!(issue.command_index, Some(3));
    }

    #[test]
    fn test_missing_fetcher_is_fatal() {
        let engine = ScriptEngine::default();
        let script = engine
            .parse(r#"[{"command": "put", "path": "$.a", "value": 1}]"#)
            .unwrap();
        let result = script.execute_with(json!({}), &ExecutionOptions::default());
        assert!(!result.success);
        assert_eq!(result.document, json!({}));
        assert_eq!(result.log_entries.len(), 1);
    }

    #[test]
    fn test_not_an_array() {
        let result = ScriptEngine::default().validate(r#"{"command": "add"}"#);
        assert!(result.has_code(codes::SCRIPT_NOT_ARRAY));
    }
}
