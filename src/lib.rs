pub mod command;
pub mod compare;
pub mod context;
pub mod error;
pub mod expression;
pub mod fetcher;
pub mod functions;
pub mod json;
pub mod lexer;
pub mod path;
pub mod script;
pub mod validation;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use command::{Command, CommandRegistry, CommandResult};
pub use compare::{CompareResult, CompareResults, CompareSettings, DifferenceType};
pub use context::{ExecutionContext, LogEntry, LogLevel, LogSink, MemorySink};
pub use error::{EngineError, FunctionError, PathError};
pub use expression::{FunctionCall, parse_function_call};
pub use fetcher::{ItemFetcher, JsonPathFetcher, NodeLocation};
pub use functions::{Function, FunctionRegistry};
pub use lexer::{LevelPair, chop};
pub use path::{Path, PathElement};
pub use script::{ExecutionOptions, ExecutionResult, Script, ScriptEngine, ScriptSettings};
pub use validation::{Severity, ValidationIssue, ValidationResult};
pub use value::Value;
