//! Validate a script without running it

use crate::script::{ScriptEngine, ScriptSettings};
use crate::validation::ValidationResult;

/// Parse the script and collect every issue
pub fn execute_validate(script: &str, allow_unknown: bool) -> ValidationResult {
    ScriptEngine::new(ScriptSettings {
        allow_unknown_commands: allow_unknown,
        ..ScriptSettings::default()
    })
    .validate(script)
}

/// One issue per line
pub fn format_issues(result: &ValidationResult) -> String {
    result
        .issues
        .iter()
        .map(|issue| format!("  {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::codes;

    #[test]
    fn test_unknown_allowed_is_warning() {
        let script = r#"[{"command": "explode"}]"#;
        assert!(!execute_validate(script, false).success());

        let lenient = execute_validate(script, true);
        assert!(lenient.success());
        assert!(lenient.has_code(codes::COMMAND_UNKNOWN));
    }

    #[test]
    fn test_root_target_fails_validation() {
        let result = execute_validate(r#"[{"command": "remove", "path": "$"}]"#, false);
        assert!(!result.success());
        assert!(result.has_code(codes::PATH_INVALID));
    }

    #[test]
    fn test_format_issues() {
        let result = execute_validate(r#"[{"command": "remove"}]"#, false);
        assert_eq!(
            format_issues(&result),
            "  error[Property.Missing] at '/0/path': 'remove' requires property 'path'"
        );
    }
}
