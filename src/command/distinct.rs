use serde_json::Value as JsonValue;

use super::{Command, CommandDefinition, CommandResult, summary, zero_match};
use crate::context::ExecutionContext;
use crate::fetcher::{ItemFetcher, NodeLocation};
use crate::error::PathError;
use crate::json::values_equal;
use crate::path::Path;
use crate::validation::ValidationIssue;

/// Removes duplicate elements from matched arrays. Elements are equal when
/// they are equal as a whole, or, with `keyPaths`, when every key path
/// resolves to equal values. The first occurrence is kept.
#[derive(Debug)]
pub struct Distinct {
    path: Path,
    key_paths: Vec<Path>,
}

impl Distinct {
    pub fn parse(def: &CommandDefinition<'_>, issues: &mut Vec<ValidationIssue>) -> Option<Box<dyn Command>> {
        let path = def.required_path("path", issues);
        let key_paths = def.relative_paths("keyPaths", issues);
        Some(Box::new(Distinct {
            path: path?,
            key_paths: key_paths?,
        }))
    }

    fn element_key(
        &self,
        fetcher: &dyn ItemFetcher,
        element: &NodeLocation,
        document: &JsonValue,
    ) -> Result<Vec<Vec<JsonValue>>, PathError> {
        self.key_paths
            .iter()
            .map(|path| -> Result<Vec<JsonValue>, PathError> {
                Ok(fetcher
                    .select_tokens(path, document, element)?
                    .iter()
                    .filter_map(|location| location.resolve(document))
                    .cloned()
                    .collect())
            })
            .collect()
    }

    /// Indices of the elements to drop from the array at `location`.
    fn duplicates(
        &self,
        fetcher: &dyn ItemFetcher,
        location: &NodeLocation,
        document: &JsonValue,
    ) -> Result<Vec<usize>, PathError> {
        let Some(JsonValue::Array(items)) = location.resolve(document) else {
            return Ok(Vec::new());
        };

        let mut duplicates = Vec::new();
        if self.key_paths.is_empty() {
            for (index, item) in items.iter().enumerate() {
                if items[..index].iter().any(|earlier| values_equal(earlier, item)) {
                    duplicates.push(index);
                }
            }
        } else {
            let mut seen: Vec<Vec<Vec<JsonValue>>> = Vec::new();
            for index in 0..items.len() {
                let key = self.element_key(fetcher, &location.index(index), document)?;
                if seen.iter().any(|earlier| keys_equal(earlier, &key)) {
                    duplicates.push(index);
                } else {
                    seen.push(key);
                }
            }
        }
        Ok(duplicates)
    }
}

fn keys_equal(a: &[Vec<JsonValue>], b: &[Vec<JsonValue>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(left, right)| {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| values_equal(l, r))
        })
}

impl Command for Distinct {
    fn name(&self) -> &str {
        "distinct"
    }

    fn execute(&self, document: &mut JsonValue, ctx: &mut ExecutionContext<'_>) -> CommandResult {
        let mut result = CommandResult::default();
        let fetcher = ctx.fetcher();
        let targets = match fetcher.select_tokens(&self.path, document, &NodeLocation::root()) {
            Ok(targets) => targets,
            Err(e) => {
                ctx.error("distinct", e.to_string());
                return result;
            }
        };
        if targets.is_empty() {
            zero_match(ctx, "distinct", &self.path);
            return result;
        }

        for target in targets {
            result.matched += 1;
            if !matches!(target.resolve(document), Some(JsonValue::Array(_))) {
                ctx.warn("distinct", format!("{} is not an array", target));
                result.skip();
                continue;
            }
            let duplicates = match self.duplicates(fetcher, &target, document) {
                Ok(duplicates) => duplicates,
                Err(e) => {
                    ctx.error("distinct", format!("{}: {}", target, e));
                    result.skip();
                    continue;
                }
            };
            if duplicates.is_empty() {
                continue;
            }
            if let Some(JsonValue::Array(items)) = target.resolve_mut(document) {
                let mut index = 0;
                items.retain(|_| {
                    let keep = duplicates.binary_search(&index).is_err();
                    index += 1;
                    keep
                });
                ctx.debug(
                    "distinct",
                    format!("removed {} duplicate(s) from {}", duplicates.len(), target),
                );
                result.change();
            }
        }
        summary(ctx, "distinct", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{LogCrateSink, LogLevel, MemorySink};
    use crate::fetcher::JsonPathFetcher;
    use serde_json::json;

    fn run(key_paths: &[&str], mut document: JsonValue) -> JsonValue {
        let distinct = Distinct {
            path: Path::parse("$.items").unwrap(),
            key_paths: key_paths.iter().map(|p| Path::parse_relative(p).unwrap()).collect(),
        };
        let mut ctx = ExecutionContext::new(&JsonPathFetcher, &LogCrateSink);
        distinct.execute(&mut document, &mut ctx);
        document
    }

    #[test]
    fn test_whole_element_equality() {
        assert_eq!(run(&[], json!({"items": [1, 2, 1, 3, 2]})), json!({"items": [1, 2, 3]}));
    }

    #[test]
    fn test_by_key_first_wins() {
        let doc = json!({"items": [{"id": 1, "v": "a"}, {"id": 2}, {"id": 1, "v": "b"}]});
        assert_eq!(run(&["id"], doc), json!({"items": [{"id": 1, "v": "a"}, {"id": 2}]}));
    }

    /// Resolves absolute paths normally and rejects every relative one.
    struct AbsoluteOnly;

    impl ItemFetcher for AbsoluteOnly {
        fn select_tokens(
            &self,
            path: &Path,
            document: &JsonValue,
            current: &NodeLocation,
        ) -> Result<Vec<NodeLocation>, PathError> {
            if path.is_relative() {
                return Err(PathError::MissingRoot {
                    path: path.raw().to_string(),
                });
            }
            JsonPathFetcher.select_tokens(path, document, current)
        }
    }

    #[test]
    fn test_key_path_error_is_logged() {
        let distinct = Distinct {
            path: Path::parse("$.items").unwrap(),
            key_paths: vec![Path::parse_relative("id").unwrap()],
        };
        let sink = MemorySink::new();
        let mut ctx = ExecutionContext::new(&AbsoluteOnly, &sink);
        let mut document = json!({"items": [{"id": 1}, {"id": 1}]});
        let result = distinct.execute(&mut document, &mut ctx);

        assert_eq!(result.skipped, 1);
        assert_eq!(document, json!({"items": [{"id": 1}, {"id": 1}]}));
        let errors: Vec<_> = sink
            .entries()
            .into_iter()
            .filter(|entry| entry.level == LogLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].group, "distinct");
    }
}
