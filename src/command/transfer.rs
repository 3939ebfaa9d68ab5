use serde_json::Value as JsonValue;

use super::add::{WriteMode, write};
use super::{
    Command, CommandDefinition, CommandResult, remove_location, removal_order, summary, zero_match,
};
use crate::context::ExecutionContext;
use crate::fetcher::NodeLocation;
use crate::path::Path;
use crate::validation::ValidationIssue;

/// The `fromPath`/`toPath` pair shared by copy and move.
#[derive(Debug)]
struct Transfer {
    from: Path,
    to: Path,
}

impl Transfer {
    fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Transfer> {
        let from = def.required_path("fromPath", issues);
        let to = def.required_path("toPath", issues);
        Some(Transfer { from: from?, to: to? })
    }

    /// The source locations and the value to write: one match as-is, several
    /// as an array.
    fn collect(
        &self,
        document: &JsonValue,
        ctx: &mut ExecutionContext<'_>,
        group: &str,
    ) -> Option<(Vec<NodeLocation>, JsonValue)> {
        let sources = match ctx.fetcher().select_tokens(&self.from, document, &NodeLocation::root()) {
            Ok(sources) => sources,
            Err(e) => {
                ctx.error(group, e.to_string());
                return None;
            }
        };
        let mut values: Vec<JsonValue> = sources
            .iter()
            .filter_map(|location| location.resolve(document))
            .cloned()
            .collect();
        let value = match values.len() {
            0 => {
                zero_match(ctx, group, &self.from);
                return None;
            }
            1 => values.pop()?,
            _ => JsonValue::Array(values),
        };
        Some((sources, value))
    }

    fn deliver(
        &self,
        value: JsonValue,
        document: &mut JsonValue,
        ctx: &mut ExecutionContext<'_>,
        group: &str,
    ) -> CommandResult {
        write(&self.to, WriteMode::Put, document, ctx, group, |_, _, _| Some(value.clone()))
    }
}

/// Copies the node(s) at `fromPath` to `toPath`.
#[derive(Debug)]
pub struct CopyValue {
    transfer: Transfer,
}

impl CopyValue {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let transfer = Transfer::parse(def, issues)?;
        Some(Box::new(CopyValue { transfer }))
    }
}

impl Command for CopyValue {
    fn name(&self) -> &str {
        "copy"
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let Some((sources, value)) = self.transfer.collect(document, ctx, "copy") else {
            return CommandResult::default();
        };
        let mut result = self.transfer.deliver(value, document, ctx, "copy");
        result.matched = sources.len();
        summary(ctx, "copy", &result);
        result
    }
}

/// Moves the node(s) at `fromPath` to `toPath`. Sources are detached before
/// the destination is written.
#[derive(Debug)]
pub struct MoveValue {
    transfer: Transfer,
}

impl MoveValue {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let transfer = Transfer::parse(def, issues)?;
        Some(Box::new(MoveValue { transfer }))
    }
}

impl Command for MoveValue {
    fn name(&self) -> &str {
        "move"
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let Some((sources, value)) = self.transfer.collect(document, ctx, "move") else {
            return CommandResult::default();
        };
        if sources.iter().any(NodeLocation::is_root) {
            ctx.warn("move", "the document root cannot be moved");
            return CommandResult {
                matched: sources.len(),
                skipped: sources.len(),
                ..CommandResult::default()
            };
        }

        let matched = sources.len();
        for source in removal_order(sources) {
            remove_location(document, &source);
        }
        let mut result = self.transfer.deliver(value, document, ctx, "move");
        result.matched = matched;
        summary(ctx, "move", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LogCrateSink;
    use crate::fetcher::JsonPathFetcher;
    use serde_json::json;

    fn transfer(from: &str, to: &str) -> Transfer {
        Transfer {
            from: Path::parse(from).unwrap(),
            to: Path::parse(to).unwrap(),
        }
    }

    #[test]
    fn test_copy_many_as_array() {
        let copy = CopyValue {
            transfer: transfer("$.items[*].id", "$.ids"),
        };
        let mut doc = json!({"items": [{"id": 1}, {"id": 2}]});
        let mut ctx = ExecutionContext::new(&JsonPathFetcher, &LogCrateSink);
        copy.execute(&mut doc, &mut ctx);
        assert_eq!(doc["ids"], json!([1, 2]));
    }

    #[test]
    fn test_move_detaches_source() {
        let moved = MoveValue {
            transfer: transfer("$.old.value", "$.new.value"),
        };
        let mut doc = json!({"old": {"value": 5}});
        let mut ctx = ExecutionContext::new(&JsonPathFetcher, &LogCrateSink);
        moved.execute(&mut doc, &mut ctx);
        assert_eq!(doc, json!({"old": {}, "new": {"value": 5}}));
    }
}
