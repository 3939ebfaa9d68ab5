use serde_json::Value as JsonValue;

use super::{Command, CommandDefinition, CommandResult, construct_parents, summary, zero_match};
use crate::context::ExecutionContext;
use crate::fetcher::NodeLocation;
use crate::path::Path;
use crate::validation::{ValidationIssue, codes};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Insert when missing, append when the target is an array.
    Add,
    /// Insert or overwrite.
    Put,
}

/// Writes a value at `path`, creating missing parent objects first.
///
/// `value_for` is called once per target with the location the value is
/// anchored at; returning `None` skips that target.
pub(crate) fn write<F>(
    path: &Path,
    mode: WriteMode,
    document: &mut JsonValue,
    ctx: &mut ExecutionContext<'_>,
    group: &str,
    mut value_for: F,
) -> CommandResult
where
    F: FnMut(&NodeLocation, &JsonValue, &mut ExecutionContext<'_>) -> Option<JsonValue>,
{
    let mut result = CommandResult::default();
    let Some(last) = path.last_element() else {
        return result;
    };

    if last.array_notation().is_some() {
        // `$.items[0]`, `$.lists[*]`: operate on existing matches only.
        let targets = match ctx.fetcher().select_tokens(path, document, &NodeLocation::root()) {
            Ok(targets) => targets,
            Err(e) => {
                ctx.error(group, e.to_string());
                return result;
            }
        };
        if targets.is_empty() {
            zero_match(ctx, group, path);
        }
        for target in targets {
            result.matched += 1;
            let Some(value) = value_for(&target, document, ctx) else {
                result.skip();
                continue;
            };
            match (mode, target.resolve_mut(document)) {
                (WriteMode::Add, Some(JsonValue::Array(items))) => {
                    items.push(value);
                    result.change();
                }
                (WriteMode::Put, Some(node)) => {
                    *node = value;
                    result.change();
                }
                _ => {
                    ctx.warn(group, format!("{} is not an array; nothing added", target));
                    result.skip();
                }
            }
        }
        return result;
    }

    let name = last.unquoted_name().to_string();
    let parents = match construct_parents(path, document, ctx, group) {
        Ok(parents) => parents,
        Err(e) => {
            ctx.error(group, e.to_string());
            return result;
        }
    };
    if parents.is_empty() {
        zero_match(ctx, group, &path.parent());
    }

    for parent in parents {
        result.matched += 1;
        let Some(value) = value_for(&parent, document, ctx) else {
            result.skip();
            continue;
        };
        let Some(JsonValue::Object(map)) = parent.resolve_mut(document) else {
            ctx.warn(group, format!("{} is not an object; '{}' skipped", parent, name));
            result.skip();
            continue;
        };
        match (mode, map.get_mut(&name)) {
            (_, None) | (WriteMode::Put, Some(_)) => {
                map.insert(name.clone(), value);
                result.change();
            }
            (WriteMode::Add, Some(JsonValue::Array(items))) => {
                items.push(value);
                result.change();
            }
            (WriteMode::Add, Some(_)) => {
                ctx.warn(
                    group,
                    format!("{} already exists and is not an array", parent.key(&name)),
                );
                result.skip();
            }
        }
    }
    result
}

/// Resolves `value` at `current`, logging failures and empty results.
pub(crate) fn resolve_value(
    value: &Value,
    current: &NodeLocation,
    document: &JsonValue,
    ctx: &mut ExecutionContext<'_>,
    group: &str,
) -> Option<JsonValue> {
    match value.resolve_node(current, document, ctx) {
        Ok(Some(node)) => Some(node),
        Ok(None) => {
            ctx.warn(group, format!("value resolved to nothing at {}", current));
            None
        }
        Err(e) => {
            ctx.warn(group, format!("{} (at {})", e, current));
            None
        }
    }
}

fn root_issue(path: &Path) -> Option<ValidationIssue> {
    (path.elements().len() < 2).then(|| {
        ValidationIssue::error(
            codes::PATH_INVALID,
            format!("'{}' targets the document root", path),
            "/path",
        )
    })
}

fn parse_target(
    def: &CommandDefinition<'_>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<(Path, Value)> {
    let path = def.required_path("path", issues);
    let value = def.required_value("value", issues);
    Some((path?, value?))
}

/// Adds a property, or appends to an existing array.
#[derive(Debug)]
pub struct Add {
    path: Path,
    value: Value,
}

impl Add {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let (path, value) = parse_target(def, issues)?;
        Some(Box::new(Add { path, value }))
    }
}

impl Command for Add {
    fn name(&self) -> &str {
        "add"
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        root_issue(&self.path).into_iter().collect()
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let result = write(&self.path, WriteMode::Add, document, ctx, "add", |at, doc, ctx| {
            resolve_value(&self.value, at, doc, ctx, "add")
        });
        summary(ctx, "add", &result);
        result
    }
}

/// Sets a property, creating or overwriting it.
#[derive(Debug)]
pub struct Put {
    path: Path,
    value: Value,
}

impl Put {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let (path, value) = parse_target(def, issues)?;
        Some(Box::new(Put { path, value }))
    }
}

impl Command for Put {
    fn name(&self) -> &str {
        "put"
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        root_issue(&self.path).into_iter().collect()
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let result = write(&self.path, WriteMode::Put, document, ctx, "put", |at, doc, ctx| {
            resolve_value(&self.value, at, doc, ctx, "put")
        });
        summary(ctx, "put", &result);
        result
    }
}
