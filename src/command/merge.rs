use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::add::resolve_value;
use super::{Command, CommandDefinition, CommandResult, summary, zero_match};
use crate::context::ExecutionContext;
use crate::fetcher::NodeLocation;
use crate::json::{type_name, values_equal};
use crate::path::Path;
use crate::validation::ValidationIssue;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayHandling {
    /// Append the incoming items.
    #[default]
    Concat,
    /// Incoming array wins.
    Replace,
    /// Append incoming items not already present.
    Union,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NullHandling {
    /// An incoming `null` overwrites.
    #[default]
    Merge,
    /// An incoming `null` is skipped.
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeSettings {
    pub array_handling: ArrayHandling,
    pub null_handling: NullHandling,
}

/// Deep-merges `source` into `target`.
pub fn merge_into(target: &mut JsonValue, source: JsonValue, settings: &MergeSettings) {
    match (target, source) {
        (JsonValue::Object(existing), JsonValue::Object(incoming)) => {
            for (key, value) in incoming {
                if value.is_null() && settings.null_handling == NullHandling::Ignore {
                    continue;
                }
                match existing.get_mut(&key) {
                    Some(slot) => merge_into(slot, value, settings),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (JsonValue::Array(existing), JsonValue::Array(incoming)) => match settings.array_handling {
            ArrayHandling::Concat => existing.extend(incoming),
            ArrayHandling::Replace => *existing = incoming,
            ArrayHandling::Union => {
                for item in incoming {
                    if !existing.iter().any(|present| values_equal(present, &item)) {
                        existing.push(item);
                    }
                }
            }
        },
        (_, JsonValue::Null) if settings.null_handling == NullHandling::Ignore => {}
        (target, source) => *target = source,
    }
}

/// Merges an object (or array) value into every matched node of the same
/// kind.
#[derive(Debug)]
pub struct Merge {
    path: Path,
    value: Value,
    settings: MergeSettings,
}

impl Merge {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let path = def.required_path("path", issues);
        let value = def.required_value("value", issues);
        let settings = def.settings::<MergeSettings>("settings", issues);
        Some(Box::new(Merge {
            path: path?,
            value: value?,
            settings: settings?,
        }))
    }
}

impl Command for Merge {
    fn name(&self) -> &str {
        "merge"
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let mut result = CommandResult::default();
        let targets = match ctx.fetcher().select_tokens(&self.path, document, &NodeLocation::root()) {
            Ok(targets) => targets,
            Err(e) => {
                ctx.error("merge", e.to_string());
                return result;
            }
        };
        if targets.is_empty() {
            zero_match(ctx, "merge", &self.path);
            return result;
        }

        let mut merges = Vec::with_capacity(targets.len());
        for target in targets {
            result.matched += 1;
            let Some(incoming) = resolve_value(&self.value, &target, document, ctx, "merge") else {
                result.skip();
                continue;
            };
            let Some(existing) = target.resolve(document) else {
                result.skip();
                continue;
            };
            let compatible = matches!(
                (existing, &incoming),
                (JsonValue::Object(_), JsonValue::Object(_)) | (JsonValue::Array(_), JsonValue::Array(_))
            );
            if !compatible {
                ctx.warn(
                    "merge",
                    format!(
                        "cannot merge {} into {} at {}",
                        type_name(&incoming),
                        type_name(existing),
                        target
                    ),
                );
                result.skip();
                continue;
            }
            merges.push((target, incoming));
        }

        for (target, incoming) in merges {
            if let Some(existing) = target.resolve_mut(document) {
                merge_into(existing, incoming, &self.settings);
                result.change();
            }
        }
        summary(ctx, "merge", &result);
        result
    }
}
