use serde_json::{Map, Value as JsonValue};

use super::{
    Command, CommandDefinition, CommandResult, remove_location, removal_order, summary, zero_match,
};
use crate::context::ExecutionContext;
use crate::fetcher::{NodeLocation, Step};
use crate::path::Path;
use crate::validation::{ValidationIssue, codes};

fn select(path: &Path, document: &JsonValue, ctx: &mut ExecutionContext<'_>, group: &str) -> Vec<NodeLocation> {
    match ctx.fetcher().select_tokens(path, document, &NodeLocation::root()) {
        Ok(found) if found.is_empty() => {
            zero_match(ctx, group, path);
            found
        }
        Ok(found) => found,
        Err(e) => {
            ctx.error(group, e.to_string());
            Vec::new()
        }
    }
}

/// Removes every match from its parent.
#[derive(Debug)]
pub struct Remove {
    path: Path,
}

impl Remove {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let path = def.required_path("path", issues)?;
        Some(Box::new(Remove { path }))
    }
}

impl Command for Remove {
    fn name(&self) -> &str {
        "remove"
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        if self.path.elements().len() < 2 {
            return vec![ValidationIssue::error(
                codes::PATH_INVALID,
                "the document root cannot be removed",
                "/path",
            )];
        }
        Vec::new()
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let mut result = CommandResult::default();
        let targets = select(&self.path, document, ctx, "remove");
        result.matched = targets.len();

        for target in removal_order(targets) {
            if target.is_root() {
                ctx.warn("remove", "the document root cannot be removed");
                result.skip();
                continue;
            }
            match remove_location(document, &target) {
                Some(_) => {
                    ctx.debug("remove", format!("removed {}", target));
                    result.change();
                }
                // Already gone with an ancestor.
                None => result.skip(),
            }
        }
        summary(ctx, "remove", &result);
        result
    }
}

/// Renames matched object properties in place, keeping their position.
#[derive(Debug)]
pub struct Rename {
    path: Path,
    name: String,
}

impl Rename {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let path = def.required_path("path", issues);
        let name = def.required_string("name", issues);
        Some(Box::new(Rename {
            path: path?,
            name: name?,
        }))
    }
}

impl Command for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        if self.name.trim().is_empty() {
            return vec![ValidationIssue::error(
                codes::PROPERTY_INVALID_TYPE,
                "'name' must not be empty",
                "/name",
            )];
        }
        Vec::new()
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let mut result = CommandResult::default();
        let targets = select(&self.path, document, ctx, "rename");
        result.matched = targets.len();

        // Deepest first, so renaming a parent can't invalidate a pending child.
        for target in removal_order(targets) {
            let Some((parent, Step::Key(old))) = target.split_last() else {
                ctx.warn("rename", format!("{} is not an object property", target));
                result.skip();
                continue;
            };
            if *old == self.name {
                result.skip();
                continue;
            }
            let Some(JsonValue::Object(map)) = parent.resolve_mut(document) else {
                result.skip();
                continue;
            };
            if map.contains_key(&self.name) {
                ctx.warn(
                    "rename",
                    format!("{} already has a property '{}'", parent, self.name),
                );
                result.skip();
                continue;
            }

            let entries = std::mem::take(map);
            *map = entries
                .into_iter()
                .map(|(key, value)| if key == *old { (self.name.clone(), value) } else { (key, value) })
                .collect::<Map<String, JsonValue>>();
            result.change();
        }
        summary(ctx, "rename", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LogCrateSink;
    use crate::fetcher::JsonPathFetcher;
    use serde_json::json;

    fn execute(command: &dyn Command, mut document: JsonValue) -> JsonValue {
        let mut ctx = ExecutionContext::new(&JsonPathFetcher, &LogCrateSink);
        command.execute(&mut document, &mut ctx);
        document
    }

    #[test]
    fn test_remove_array_items_highest_first() {
        let remove = Remove {
            path: Path::parse("$.items[0,2]").unwrap(),
        };
        assert_eq!(execute(&remove, json!({"items": [1, 2, 3]})), json!({"items": [2]}));
    }

    #[test]
    fn test_rename_keeps_order() {
        let rename = Rename {
            path: Path::parse("$.b").unwrap(),
            name: "beta".to_string(),
        };
        let document = execute(&rename, json!({"a": 1, "b": 2, "c": 3}));
        let keys: Vec<_> = document.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "beta", "c"]);
    }
}
