use serde_json::Value as JsonValue;

use super::add::{WriteMode, write};
use super::{Command, CommandDefinition, CommandResult, summary, zero_match};
use crate::compare::{CompareSettings, Comparer, compare_matches};
use crate::context::ExecutionContext;
use crate::fetcher::{JsonPathFetcher, NodeLocation};
use crate::path::Path;
use crate::validation::{ValidationIssue, codes};

/// Diffs the nodes at `leftPath` against those at `rightPath` and puts the
/// result list at `resultPath`.
#[derive(Debug)]
pub struct Compare {
    left: Path,
    right: Path,
    result: Path,
    settings: CompareSettings,
}

impl Compare {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let left = def.required_path("leftPath", issues);
        let right = def.required_path("rightPath", issues);
        let result = def.required_path("resultPath", issues);
        let settings = def.settings::<CompareSettings>("settings", issues)?;

        if let Err(e) = Comparer::new(&settings, &JsonPathFetcher) {
            issues.push(
                ValidationIssue::error(codes::SETTINGS_INVALID, e.to_string(), def.location("settings"))
                    .at_command(def.index),
            );
            return None;
        }

        Some(Box::new(Compare {
            left: left?,
            right: right?,
            result: result?,
            settings,
        }))
    }

    fn select(&self, path: &Path, document: &JsonValue, ctx: &mut ExecutionContext<'_>) -> Option<Vec<NodeLocation>> {
        match ctx.fetcher().select_tokens(path, document, &NodeLocation::root()) {
            Ok(found) => {
                if found.is_empty() {
                    zero_match(ctx, "compare", path);
                }
                Some(found)
            }
            Err(e) => {
                ctx.error("compare", e.to_string());
                None
            }
        }
    }
}

impl Command for Compare {
    fn name(&self) -> &str {
        "compare"
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        if self.result.elements().len() < 2 {
            return vec![ValidationIssue::error(
                codes::PATH_INVALID,
                "results cannot replace the document root",
                "/resultPath",
            )];
        }
        Vec::new()
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let (Some(left), Some(right)) = (
            self.select(&self.left, document, ctx),
            self.select(&self.right, document, ctx),
        ) else {
            return CommandResult::default();
        };

        let results = match compare_matches(document, &left, &right, &self.settings, ctx.fetcher()) {
            Ok(results) => results,
            Err(e) => {
                ctx.error("compare", e.to_string());
                return CommandResult::default();
            }
        };
        for warning in &results.warnings {
            ctx.warn("compare", warning.as_str());
        }
        ctx.info(
            "compare",
            format!(
                "{} result(s), {} difference(s)",
                results.len(),
                results.differences().count()
            ),
        );

        let serialized = match serde_json::to_value(&results.results) {
            Ok(serialized) => serialized,
            Err(e) => {
                ctx.error("compare", e.to_string());
                return CommandResult::default();
            }
        };
        let mut result = write(&self.result, WriteMode::Put, document, ctx, "compare", |_, _, _| {
            Some(serialized.clone())
        });
        result.matched = left.len().max(right.len());
        summary(ctx, "compare", &result);
        result
    }
}
