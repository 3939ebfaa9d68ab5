use chrono::{SecondsFormat, Utc};
use serde_json::{Value as JsonValue, json};

use super::{Function, FunctionArgs, FunctionFactory};
use crate::context::ExecutionContext;
use crate::error::FunctionError;
use crate::json::{as_text, type_name};

pub(super) const FACTORIES: &[FunctionFactory] = &[
    factory::<ValueOf>,
    factory::<Concat>,
    factory::<Upper>,
    factory::<Lower>,
    factory::<Count>,
    factory::<Coalesce>,
    factory::<Now>,
];

fn factory<F: Function + Default + 'static>() -> Box<dyn Function> {
    Box::new(F::default())
}

/// `#valueof($.path)`: the matched node(s) themselves.
#[derive(Default)]
struct ValueOf;

impl Function for ValueOf {
    fn name(&self) -> &str {
        "valueof"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }

    fn execute(&self, args: FunctionArgs, _ctx: &mut ExecutionContext<'_>) -> Result<Vec<JsonValue>, FunctionError> {
        Ok(args.into_iter().flatten().collect())
    }
}

/// `#concat(a, b, ...)`: every node of every argument as text, joined.
#[derive(Default)]
struct Concat;

impl Function for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, None)
    }

    fn execute(&self, args: FunctionArgs, _ctx: &mut ExecutionContext<'_>) -> Result<Vec<JsonValue>, FunctionError> {
        let text: String = args.iter().flatten().map(as_text).collect();
        Ok(vec![JsonValue::String(text)])
    }
}

fn map_strings(
    function: &str,
    args: FunctionArgs,
    f: impl Fn(&str) -> String,
) -> Result<Vec<JsonValue>, FunctionError> {
    args.into_iter()
        .flatten()
        .map(|value| match value {
            JsonValue::String(s) => Ok(JsonValue::String(f(&s))),
            other => Err(FunctionError::failed(
                function,
                format!("requires string, got {}", type_name(&other)),
            )),
        })
        .collect()
}

#[derive(Default)]
struct Upper;

impl Function for Upper {
    fn name(&self) -> &str {
        "upper"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }

    fn execute(&self, args: FunctionArgs, _ctx: &mut ExecutionContext<'_>) -> Result<Vec<JsonValue>, FunctionError> {
        map_strings(self.name(), args, str::to_uppercase)
    }
}

#[derive(Default)]
struct Lower;

impl Function for Lower {
    fn name(&self) -> &str {
        "lower"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }

    fn execute(&self, args: FunctionArgs, _ctx: &mut ExecutionContext<'_>) -> Result<Vec<JsonValue>, FunctionError> {
        map_strings(self.name(), args, str::to_lowercase)
    }
}

/// `#count($.items[*])`: how many nodes the arguments produced.
#[derive(Default)]
struct Count;

impl Function for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, None)
    }

    fn execute(&self, args: FunctionArgs, _ctx: &mut ExecutionContext<'_>) -> Result<Vec<JsonValue>, FunctionError> {
        Ok(vec![json!(args.iter().map(Vec::len).sum::<usize>())])
    }
}

/// `#coalesce(a, b, ...)`: the first non-null node.
#[derive(Default)]
struct Coalesce;

impl Function for Coalesce {
    fn name(&self) -> &str {
        "coalesce"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, None)
    }

    fn execute(&self, args: FunctionArgs, _ctx: &mut ExecutionContext<'_>) -> Result<Vec<JsonValue>, FunctionError> {
        args.into_iter()
            .flatten()
            .find(|value| !value.is_null())
            .map(|value| vec![value])
            .ok_or_else(|| FunctionError::failed(self.name(), "every argument was null or missing"))
    }
}

/// `#now()`: the current UTC time, RFC-3339.
#[derive(Default)]
struct Now;

impl Function for Now {
    fn name(&self) -> &str {
        "now"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }

    fn execute(&self, _args: FunctionArgs, _ctx: &mut ExecutionContext<'_>) -> Result<Vec<JsonValue>, FunctionError> {
        Ok(vec![JsonValue::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))])
    }
}
