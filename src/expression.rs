//! Function-call detection for value strings.
//!
//! `#concat('Hello ', #upper($.name))` is a call to `concat` with the raw
//! arguments `'Hello '` and `#upper($.name)`. Arguments are kept as raw text
//! here; [`crate::value::Value`] parses each one again, which is how calls nest.

use std::sync::LazyLock;

use regex::Regex;

use crate::lexer::{
    ARGUMENT_CLOSE, ARGUMENT_DELIMITER, ARGUMENT_LEVELS, ARGUMENT_OPEN, FUNCTION_MARKER, chop,
    find_matching_close,
};

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("function name pattern"));

/// The outcome of looking at a value string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<String>,
    pub is_function: bool,
}

impl FunctionCall {
    fn not_a_function() -> Self {
        FunctionCall::default()
    }
}

/// True when `text` uses function-call syntax. `##` escapes a literal `#`.
pub fn is_function_text(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with(FUNCTION_MARKER) && !text[FUNCTION_MARKER.len_utf8()..].starts_with(FUNCTION_MARKER)
}

/// Strips the escape from `##literal`, giving `#literal`.
pub fn unescape_marker(text: &str) -> &str {
    let escaped = format!("{0}{0}", FUNCTION_MARKER);
    if text.starts_with(&escaped) {
        &text[FUNCTION_MARKER.len_utf8()..]
    } else {
        text
    }
}

/// Splits `#name(arg, ...)` into its name and raw arguments.
///
/// A missing closing `)` is tolerated and the arguments run to the end of the
/// text. `#name` without parentheses is a call with no arguments. Text that
/// doesn't start with the marker, or whose name isn't an identifier, is not a
/// function.
pub fn parse_function_call(text: &str) -> FunctionCall {
    let text = text.trim();
    if !is_function_text(text) {
        return FunctionCall::not_a_function();
    }
    let body = &text[FUNCTION_MARKER.len_utf8()..];

    let Some(open) = body.find(ARGUMENT_OPEN) else {
        return named(body.trim(), Vec::new());
    };
    let name = body[..open].trim();

    let arguments_text = match find_matching_close(body, open, ARGUMENT_LEVELS) {
        Some(close) => {
            if !body[close + ARGUMENT_CLOSE.len_utf8()..].trim().is_empty() {
                return FunctionCall::not_a_function();
            }
            &body[open + 1..close]
        }
        None => body[open + 1..]
            .strip_suffix(ARGUMENT_CLOSE)
            .unwrap_or(&body[open + 1..]),
    };

    named(name, chop(arguments_text, &[ARGUMENT_DELIMITER], ARGUMENT_LEVELS))
}

fn named(name: &str, arguments: Vec<String>) -> FunctionCall {
    if !FUNCTION_NAME.is_match(name) {
        return FunctionCall::not_a_function();
    }
    FunctionCall {
        name: name.to_string(),
        arguments,
        is_function: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_function() {
        let call = parse_function_call("hello");
        assert!(!call.is_function);
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_escaped_marker() {
        assert!(!parse_function_call("##tag").is_function);
        assert_eq!(unescape_marker("##tag"), "#tag");
        assert_eq!(unescape_marker("tag"), "tag");
    }

    #[test]
    fn test_trailing_text_after_close() {
        assert!(!parse_function_call("#upper(a) and more").is_function);
    }

    #[test]
    fn test_no_parentheses() {
        let call = parse_function_call("#now");
        assert!(call.is_function);
        assert_eq!(call.name, "now");
        assert!(call.arguments.is_empty());
    }
}
