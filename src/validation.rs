//! Validation issues collected while parsing a script.
//!
//! Issues are values, never errors: parsing keeps going after a bad command so
//! that one pass reports everything wrong with a script.

use std::fmt;

use serde::Serialize;

/// Stable issue codes.
pub mod codes {
    pub const SCRIPT_INVALID_JSON: &str = "Script.InvalidJson";
    pub const SCRIPT_NOT_ARRAY: &str = "Script.NotArray";
    pub const COMMAND_NOT_OBJECT: &str = "Command.NotObject";
    pub const COMMAND_MISSING_NAME: &str = "Command.MissingName";
    pub const COMMAND_UNKNOWN: &str = "Command.Unknown";
    pub const PROPERTY_MISSING: &str = "Property.Missing";
    pub const PROPERTY_INVALID_TYPE: &str = "Property.InvalidType";
    pub const PATH_INVALID: &str = "Path.Invalid";
    pub const FUNCTION_UNKNOWN: &str = "Function.Unknown";
    pub const FUNCTION_ARITY: &str = "Function.Arity";
    pub const SETTINGS_INVALID: &str = "Settings.Invalid";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    /// RFC-6901 pointer into the script, e.g. `/2/path`.
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_index: Option<usize>,
}

impl ValidationIssue {
    pub fn error(code: &str, message: impl Into<String>, location: impl Into<String>) -> Self {
        ValidationIssue {
            severity: Severity::Error,
            code: code.to_string(),
            message: message.into(),
            location: location.into(),
            command_index: None,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>, location: impl Into<String>) -> Self {
        ValidationIssue {
            severity: Severity::Warning,
            ..ValidationIssue::error(code, message, location)
        }
    }

    pub fn at_command(mut self, index: usize) -> Self {
        self.command_index = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}[{}] at '{}': {}", severity, self.code, self.location, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// No error-severity issues. Warnings don't fail a script.
    pub fn success(&self) -> bool {
        !self.issues.iter().any(ValidationIssue::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

/// Builds an RFC-6901 pointer from reference tokens.
pub fn pointer<I, T>(tokens: I) -> String
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    tokens
        .into_iter()
        .map(|token| format!("/{}", token.to_string().replace('~', "~0").replace('/', "~1")))
        .collect()
}

#[test]
fn test_pointer_escaping() {
    assert_eq!(pointer(["0", "a/b"]), "/0/a~1b");
    assert_eq!(pointer::<[usize; 0], usize>([]), "");
}

#[test]
fn test_warnings_do_not_fail() {
    let mut result = ValidationResult::default();
    result.push(ValidationIssue::warning(codes::COMMAND_UNKNOWN, "unknown", "/0/command"));
    assert!(result.success());
    result.push(ValidationIssue::error(codes::PROPERTY_MISSING, "missing", "/1/path"));
    assert!(!result.success());
}
