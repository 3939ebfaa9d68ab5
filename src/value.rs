use std::fmt;

use serde_json::Value as JsonValue;

use crate::context::ExecutionContext;
use crate::error::FunctionError;
use crate::expression::{FunctionCall, is_function_text, parse_function_call, unescape_marker};
use crate::fetcher::NodeLocation;
use crate::functions::{Function, FunctionRegistry, check_arity};
use crate::path::{CURRENT_INDICATOR, PARENT_INDICATOR, Path, ROOT_INDICATOR, unquote};

/// A value expression as written in a script, parsed once.
///
/// Function arguments are themselves `Value`s, so `#concat('a', #upper($.b))`
/// is a small tree that is walked on every resolve without re-tokenizing.
///
/// # Examples
///
/// ```
/// use clove_script::{FunctionRegistry, Value};
/// use serde_json::json;
///
/// let functions = FunctionRegistry::default();
/// let fixed = Value::parse(&json!({"a": 1}), &functions).unwrap();
/// assert!(matches!(fixed, Value::Fixed(_)));
///
/// let call = Value::parse(&json!("#upper($.name)"), &functions).unwrap();
/// assert!(matches!(call, Value::Function(_)));
/// ```
#[derive(Debug)]
pub enum Value {
    /// A literal, returned as-is.
    Fixed(JsonValue),

    /// A path argument; resolves to every node it matches.
    Path(Path),

    /// A function call with its bound arguments.
    Function(FunctionValue),
}

/// A parsed call: the descriptor, the function instance and its arguments.
pub struct FunctionValue {
    pub call: FunctionCall,
    pub function: Box<dyn Function>,
    pub arguments: Vec<Value>,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.call.name)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl Value {
    /// Parses a command's `value` property. Only strings using function-call
    /// syntax become functions; everything else is fixed.
    pub fn parse(raw: &JsonValue, functions: &FunctionRegistry) -> Result<Value, FunctionError> {
        match raw {
            JsonValue::String(text) if is_function_text(text) => Value::parse_function(text, functions),
            JsonValue::String(text) => Ok(Value::Fixed(JsonValue::String(unescape_marker(text).to_string()))),
            other => Ok(Value::Fixed(other.clone())),
        }
    }

    /// Parses one raw function argument.
    ///
    /// - `#fn(...)` → nested function
    /// - `$...`, `@...`, `^...` → path
    /// - `'text'` or `"text"` → string
    /// - a JSON literal (`12`, `true`, `null`, `[1,2]`) → that literal
    /// - anything else → the text itself
    pub fn parse_argument(raw: &str, functions: &FunctionRegistry) -> Result<Value, FunctionError> {
        let raw = raw.trim();
        if is_function_text(raw) {
            return Value::parse_function(raw, functions);
        }
        if raw.starts_with([ROOT_INDICATOR, CURRENT_INDICATOR, PARENT_INDICATOR]) {
            return Ok(Value::Path(Path::parse(raw)?));
        }
        if raw.starts_with('\'') || raw.starts_with('"') {
            return Ok(Value::Fixed(JsonValue::String(unquote(raw).to_string())));
        }
        match serde_json::from_str::<JsonValue>(raw) {
            Ok(literal) => Ok(Value::Fixed(literal)),
            Err(_) => Ok(Value::Fixed(JsonValue::String(unescape_marker(raw).to_string()))),
        }
    }

    fn parse_function(text: &str, functions: &FunctionRegistry) -> Result<Value, FunctionError> {
        let call = parse_function_call(text);
        if !call.is_function {
            return Ok(Value::Fixed(JsonValue::String(text.to_string())));
        }

        let function = functions
            .create(&call.name)
            .ok_or_else(|| FunctionError::Unknown(call.name.clone()))?;
        check_arity(function.as_ref(), call.arguments.len())?;

        let arguments = call
            .arguments
            .iter()
            .map(|argument| Value::parse_argument(argument, functions))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Value::Function(FunctionValue {
            call,
            function,
            arguments,
        }))
    }

    /// Resolves to zero or more nodes. `current` anchors `@` paths.
    pub fn resolve(
        &self,
        current: &NodeLocation,
        document: &JsonValue,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Vec<JsonValue>, FunctionError> {
        match self {
            Value::Fixed(value) => Ok(vec![value.clone()]),
            Value::Path(path) => Ok(ctx
                .fetcher()
                .select_tokens(path, document, current)?
                .iter()
                .filter_map(|location| location.resolve(document))
                .cloned()
                .collect()),
            Value::Function(call) => {
                let args = call
                    .arguments
                    .iter()
                    .map(|argument| argument.resolve(current, document, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                call.function.execute(args, ctx)
            }
        }
    }

    /// Resolves to a single node: one result as-is, several as an array,
    /// none as `None`.
    pub fn resolve_node(
        &self,
        current: &NodeLocation,
        document: &JsonValue,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Option<JsonValue>, FunctionError> {
        let mut nodes = self.resolve(current, document, ctx)?;
        Ok(match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(JsonValue::Array(nodes)),
        })
    }

    /// True when resolving depends on the node being operated on.
    pub fn is_relative(&self) -> bool {
        match self {
            Value::Fixed(_) => false,
            Value::Path(path) => path.is_relative(),
            Value::Function(call) => call.arguments.iter().any(Value::is_relative),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escaped_marker_is_fixed() {
        let value = Value::parse(&json!("##tag"), &FunctionRegistry::default()).unwrap();
        assert!(matches!(value, Value::Fixed(JsonValue::String(ref s)) if s == "#tag"));
    }

    #[test]
    fn test_argument_kinds() {
        let functions = FunctionRegistry::default();
        assert!(matches!(Value::parse_argument("$.a", &functions).unwrap(), Value::Path(_)));
        assert!(matches!(Value::parse_argument("12", &functions).unwrap(), Value::Fixed(JsonValue::Number(_))));
        assert!(matches!(Value::parse_argument("'12'", &functions).unwrap(), Value::Fixed(JsonValue::String(_))));
        assert!(matches!(Value::parse_argument("plain words", &functions).unwrap(), Value::Fixed(JsonValue::String(_))));
    }

    #[test]
    fn test_relative_detection() {
        let functions = FunctionRegistry::default();
        assert!(Value::parse(&json!("#upper(@.name)"), &functions).unwrap().is_relative());
        assert!(!Value::parse(&json!("#upper($.name)"), &functions).unwrap().is_relative());
    }
}
