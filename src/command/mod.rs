//! Script commands.
//!
//! A command is parsed once from its JSON object by a factory registered under
//! the command's name, validating its own properties as it goes. At run time
//! it checks itself again, then mutates the document in place and reports
//! what it did through the [`ExecutionContext`].

mod add;
mod compare;
mod distinct;
mod merge;
mod remove;
mod set;
mod transfer;

pub use add::{Add, Put};
pub use compare::Compare;
pub use distinct::Distinct;
pub use merge::{ArrayHandling, Merge, MergeSettings, NullHandling};
pub use remove::{Remove, Rename};
pub use set::Set;
pub use transfer::{CopyValue, MoveValue};

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::context::ExecutionContext;
use crate::error::{FunctionError, PathError, RegistryError};
use crate::fetcher::{NodeLocation, Step};
use crate::functions::FunctionRegistry;
use crate::json::type_name;
use crate::path::{Path, PathElement};
use crate::validation::{ValidationIssue, codes, pointer};
use crate::value::Value;

/// What one command invocation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Nodes the command's path(s) matched.
    pub matched: usize,
    /// Nodes actually changed.
    pub changed: usize,
    /// Matches left alone (value failed, wrong shape, ...).
    pub skipped: usize,
}

impl CommandResult {
    fn skip(&mut self) {
        self.skipped += 1;
    }

    fn change(&mut self) {
        self.changed += 1;
    }
}

/// One script operation.
pub trait Command: fmt::Debug {
    fn name(&self) -> &str;

    /// Checks run immediately before executing.
    fn validate(&self) -> Vec<ValidationIssue> {
        Vec::new()
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult;
}

/// Parses one command object. Returns `None` when the issues pushed make the
/// command unusable.
pub type CommandFactory =
    fn(&CommandDefinition<'_>, &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>>;

/// Maps command names (case-insensitive) to factories.
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandFactory>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, factory: CommandFactory) -> Result<(), RegistryError> {
        let name = name.to_lowercase();
        let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(RegistryError::InvalidName(name));
        }
        if self.commands.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.commands.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<CommandFactory> {
        self.commands.get(&name.to_lowercase()).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl Default for CommandRegistry {
    /// A registry with every built-in command.
    fn default() -> Self {
        let builtins: [(&str, CommandFactory); 10] = [
            ("add", Add::parse),
            ("put", Put::parse),
            ("set", Set::parse),
            ("remove", Remove::parse),
            ("rename", Rename::parse),
            ("copy", CopyValue::parse),
            ("move", MoveValue::parse),
            ("merge", Merge::parse),
            ("distinct", Distinct::parse),
            ("compare", Compare::parse),
        ];
        let mut registry = Self::new();
        for (name, factory) in builtins {
            // Fixed names, can't clash.
            let _ = registry.register(name, factory);
        }
        registry
    }
}

/// A command's JSON object plus what a factory needs to parse it.
pub struct CommandDefinition<'a> {
    pub index: usize,
    pub name: &'a str,
    pub properties: &'a Map<String, JsonValue>,
    pub functions: &'a FunctionRegistry,
}

impl<'a> CommandDefinition<'a> {
    /// Pointer to a property of this command, e.g. `/3/path`.
    pub fn location(&self, property: &str) -> String {
        pointer([self.index.to_string(), property.to_string()])
    }

    fn issue(&self, code: &str, property: &str, message: String) -> ValidationIssue {
        ValidationIssue::error(code, message, self.location(property)).at_command(self.index)
    }

    fn required(&self, property: &str, issues: &mut Vec<ValidationIssue>) -> Option<&'a JsonValue> {
        let found = self.properties.get(property);
        if found.is_none() {
            issues.push(self.issue(
                codes::PROPERTY_MISSING,
                property,
                format!("'{}' requires property '{}'", self.name, property),
            ));
        }
        found
    }

    pub fn required_string(&self, property: &str, issues: &mut Vec<ValidationIssue>) -> Option<String> {
        match self.required(property, issues)? {
            JsonValue::String(text) => Some(text.clone()),
            other => {
                issues.push(self.issue(
                    codes::PROPERTY_INVALID_TYPE,
                    property,
                    format!("'{}' must be a string, got {}", property, type_name(other)),
                ));
                None
            }
        }
    }

    pub fn required_path(&self, property: &str, issues: &mut Vec<ValidationIssue>) -> Option<Path> {
        let text = self.required_string(property, issues)?;
        self.path(property, &text, issues)
    }

    pub fn optional_path(&self, property: &str, issues: &mut Vec<ValidationIssue>) -> Option<Path> {
        match self.properties.get(property)? {
            JsonValue::String(text) => self.path(property, text, issues),
            other => {
                issues.push(self.issue(
                    codes::PROPERTY_INVALID_TYPE,
                    property,
                    format!("'{}' must be a string, got {}", property, type_name(other)),
                ));
                None
            }
        }
    }

    fn path(&self, property: &str, text: &str, issues: &mut Vec<ValidationIssue>) -> Option<Path> {
        Path::parse(text)
            .map_err(|e| issues.push(self.path_issue(property, e)))
            .ok()
    }

    fn path_issue(&self, property: &str, error: PathError) -> ValidationIssue {
        self.issue(codes::PATH_INVALID, property, error.to_string())
    }

    pub fn required_value(&self, property: &str, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
        let raw = self.required(property, issues)?;
        match Value::parse(raw, self.functions) {
            Ok(value) => Some(value),
            Err(error) => {
                let code = match &error {
                    FunctionError::Unknown(_) => codes::FUNCTION_UNKNOWN,
                    FunctionError::Arity { .. } => codes::FUNCTION_ARITY,
                    FunctionError::Path(_) => codes::PATH_INVALID,
                    FunctionError::Failed { .. } => codes::PROPERTY_INVALID_TYPE,
                };
                issues.push(self.issue(code, property, error.to_string()));
                None
            }
        }
    }

    /// Relative paths from a string array, e.g. `keyPaths: ["id", "@.sku"]`.
    /// A missing property gives an empty list.
    pub fn relative_paths(&self, property: &str, issues: &mut Vec<ValidationIssue>) -> Option<Vec<Path>> {
        let Some(raw) = self.properties.get(property) else {
            return Some(Vec::new());
        };
        let Some(items) = raw.as_array() else {
            issues.push(self.issue(
                codes::PROPERTY_INVALID_TYPE,
                property,
                format!("'{}' must be an array of strings", property),
            ));
            return None;
        };

        let mut paths = Vec::with_capacity(items.len());
        for item in items {
            let Some(text) = item.as_str() else {
                issues.push(self.issue(
                    codes::PROPERTY_INVALID_TYPE,
                    property,
                    format!("'{}' must be an array of strings", property),
                ));
                return None;
            };
            match Path::parse_relative(text) {
                Ok(path) => paths.push(path),
                Err(e) => {
                    issues.push(self.path_issue(property, e));
                    return None;
                }
            }
        }
        Some(paths)
    }

    /// Deserializes an optional settings object; missing means defaults.
    pub fn settings<T>(&self, property: &str, issues: &mut Vec<ValidationIssue>) -> Option<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.properties.get(property) else {
            return Some(T::default());
        };
        match serde_json::from_value(raw.clone()) {
            Ok(settings) => Some(settings),
            Err(e) => {
                issues.push(self.issue(codes::SETTINGS_INVALID, property, e.to_string()));
                None
            }
        }
    }
}

fn constructible(element: &PathElement) -> bool {
    element.array_notation().is_none()
        && !matches!(element.element_name(), "" | "*" | "$" | "@" | "^")
}

/// Finds the parents a write to `path` targets, creating missing
/// intermediate objects along the construction path first.
///
/// An intermediate that exists but isn't an object is left alone and logged;
/// that branch simply produces no parent.
pub(crate) fn construct_parents(
    path: &Path,
    document: &mut JsonValue,
    ctx: &mut ExecutionContext<'_>,
    group: &str,
) -> Result<Vec<NodeLocation>, PathError> {
    let fetcher = ctx.fetcher();
    let elements = path.construction_path();
    let root = NodeLocation::root();

    for depth in 1..elements.len() {
        let element = &elements[depth];
        if !constructible(element) {
            continue;
        }
        let name = element.unquoted_name();
        let parents = fetcher.select_tokens(&Path::from_elements(&elements[..depth]), document, &root)?;
        for parent in parents {
            match parent.resolve_mut(document) {
                Some(JsonValue::Object(map)) => {
                    if !map.contains_key(name) {
                        map.insert(name.to_string(), JsonValue::Object(Map::new()));
                        ctx.debug(group, format!("created {}", parent.key(name)));
                    }
                }
                Some(other) => {
                    let kind = type_name(other);
                    ctx.warn(
                        group,
                        format!("cannot create '{}' under {}: it is {}, not an object", name, parent, kind),
                    );
                }
                None => {}
            }
        }
    }

    fetcher.select_tokens(&path.parent(), document, &root)
}

/// Detaches the node at `location` from its parent. The root can't be removed.
pub(crate) fn remove_location(document: &mut JsonValue, location: &NodeLocation) -> Option<JsonValue> {
    let (parent, step) = location.split_last()?;
    match (parent.resolve_mut(document)?, step) {
        (JsonValue::Object(map), Step::Key(key)) => map.shift_remove(key),
        (JsonValue::Array(items), Step::Index(index)) if *index < items.len() => Some(items.remove(*index)),
        _ => None,
    }
}

/// Sorts locations so that removing them in order never shifts one that is
/// still pending: later array indices and deeper nodes come first.
pub(crate) fn removal_order(mut locations: Vec<NodeLocation>) -> Vec<NodeLocation> {
    locations.sort_by(|a, b| b.steps().cmp(a.steps()));
    locations.dedup();
    locations
}

pub(crate) fn zero_match(ctx: &mut ExecutionContext<'_>, group: &str, path: &Path) {
    ctx.warn(group, format!("path '{}' matched nothing", path));
}

pub(crate) fn summary(ctx: &mut ExecutionContext<'_>, group: &str, result: &CommandResult) {
    ctx.info(
        group,
        format!(
            "matched {}, changed {}, skipped {}",
            result.matched, result.changed, result.skipped
        ),
    );
}
