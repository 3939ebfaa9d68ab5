use serde_json::Value as JsonValue;

use super::add::resolve_value;
use super::{Command, CommandDefinition, CommandResult, summary, zero_match};
use crate::context::ExecutionContext;
use crate::fetcher::NodeLocation;
use crate::path::Path;
use crate::validation::ValidationIssue;
use crate::value::Value;

/// Replaces every existing match. Nothing is created; `@` in the value refers
/// to the node being replaced.
#[derive(Debug)]
pub struct Set {
    path: Path,
    value: Value,
}

impl Set {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let path = def.required_path("path", issues);
        let value = def.required_value("value", issues);
        Some(Box::new(Set {
            path: path?,
            value: value?,
        }))
    }
}

impl Command for Set {
    fn name(&self) -> &str {
        "set"
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let mut result = CommandResult::default();
        let targets = match ctx.fetcher().select_tokens(&self.path, document, &NodeLocation::root()) {
            Ok(targets) => targets,
            Err(e) => {
                ctx.error("set", e.to_string());
                return result;
            }
        };
        if targets.is_empty() {
            zero_match(ctx, "set", &self.path);
            return result;
        }

        // All values see the document as it was before this command.
        let mut replacements = Vec::with_capacity(targets.len());
        for target in targets {
            result.matched += 1;
            match resolve_value(&self.value, &target, document, ctx, "set") {
                Some(value) => replacements.push((target, value)),
                None => result.skip(),
            }
        }

        for (target, value) in replacements {
            match target.resolve_mut(document) {
                Some(node) => {
                    *node = value;
                    result.change();
                }
                None => result.skip(),
            }
        }
        summary(ctx, "set", &result);
        result
    }
}
