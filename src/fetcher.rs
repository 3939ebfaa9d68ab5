//! Item fetching: turning a [`Path`] plus a document into matched locations.
//!
//! Matches are returned as [`NodeLocation`]s rather than references so that a
//! command can resolve everything it needs first and mutate the document
//! afterwards through [`NodeLocation::resolve_mut`].

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::PathError;
use crate::json::{compare_values, values_equal};
use crate::path::{
    CURRENT_INDICATOR, Filter, FilterOp, FilterOperand, PARENT_INDICATOR, Path, PathElement,
    ROOT_INDICATOR, Selector, WILDCARD,
};

/// One step from a node to a child.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// Absolute location of a node inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodeLocation {
    steps: Vec<Step>,
}

impl NodeLocation {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn child(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        NodeLocation { steps }
    }

    pub fn key(&self, key: &str) -> Self {
        self.child(Step::Key(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(Step::Index(index))
    }

    /// The parent location and the step leading here; `None` for the root.
    pub fn split_last(&self) -> Option<(NodeLocation, &Step)> {
        let (last, parent) = self.steps.split_last()?;
        Some((
            NodeLocation {
                steps: parent.to_vec(),
            },
            last,
        ))
    }

    pub fn parent(&self) -> Option<NodeLocation> {
        self.split_last().map(|(parent, _)| parent)
    }

    /// True when `other` lies strictly below this location.
    pub fn is_ancestor_of(&self, other: &NodeLocation) -> bool {
        other.steps.len() > self.steps.len() && other.steps.starts_with(&self.steps)
    }

    /// RFC-6901 JSON pointer.
    pub fn pointer(&self) -> String {
        self.steps
            .iter()
            .map(|step| match step {
                Step::Key(key) => format!("/{}", key.replace('~', "~0").replace('/', "~1")),
                Step::Index(index) => format!("/{}", index),
            })
            .collect()
    }

    /// Normalized path text, e.g. `$.orders[0]['unit price']`.
    pub fn normalized(&self) -> String {
        let mut text = ROOT_INDICATOR.to_string();
        for step in &self.steps {
            match step {
                Step::Key(key) if is_plain_name(key) => {
                    text.push('.');
                    text.push_str(key);
                }
                Step::Key(key) => text.push_str(&format!("['{}']", key.replace('\'', "\\'"))),
                Step::Index(index) => text.push_str(&format!("[{}]", index)),
            }
        }
        text
    }

    pub fn resolve<'v>(&self, root: &'v JsonValue) -> Option<&'v JsonValue> {
        self.steps.iter().try_fold(root, |node, step| match step {
            Step::Key(key) => node.as_object()?.get(key),
            Step::Index(index) => node.as_array()?.get(*index),
        })
    }

    pub fn resolve_mut<'v>(&self, root: &'v mut JsonValue) -> Option<&'v mut JsonValue> {
        self.steps.iter().try_fold(root, |node, step| match step {
            Step::Key(key) => node.as_object_mut()?.get_mut(key),
            Step::Index(index) => node.as_array_mut()?.get_mut(*index),
        })
    }
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

fn is_plain_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// The path-evaluation collaborator used by commands and values.
pub trait ItemFetcher {
    /// Every node matched by `path`, in document order. `current` anchors
    /// `@`-relative paths.
    fn select_tokens(
        &self,
        path: &Path,
        document: &JsonValue,
        current: &NodeLocation,
    ) -> Result<Vec<NodeLocation>, PathError>;

    /// The first node matched by `path`, if any.
    fn select_token(
        &self,
        path: &Path,
        document: &JsonValue,
        current: &NodeLocation,
    ) -> Result<Option<NodeLocation>, PathError> {
        Ok(self.select_tokens(path, document, current)?.into_iter().next())
    }

    /// Rewrites an `@`- or `^`-relative path as an absolute one.
    fn get_path(&self, relative: &str, current: &NodeLocation) -> String {
        if let Some(rest) = relative.strip_prefix(CURRENT_INDICATOR) {
            format!("{}{}", current.normalized(), rest)
        } else if let Some(rest) = relative.strip_prefix(PARENT_INDICATOR) {
            let parent = current.parent().unwrap_or_default();
            format!("{}{}", parent.normalized(), rest)
        } else {
            relative.to_string()
        }
    }
}

/// The bundled fetcher: JSONPath-style names, wildcards, recursive descent,
/// index/slice/union selectors and `?()` filters.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPathFetcher;

impl ItemFetcher for JsonPathFetcher {
    fn select_tokens(
        &self,
        path: &Path,
        document: &JsonValue,
        current: &NodeLocation,
    ) -> Result<Vec<NodeLocation>, PathError> {
        let Some((first, rest)) = path.elements().split_first() else {
            return Ok(Vec::new());
        };

        let start = match first.element_name() {
            "$" => vec![NodeLocation::root()],
            "@" => vec![current.clone()],
            "^" => current.parent().into_iter().collect(),
            _ => {
                return Err(PathError::MissingRoot {
                    path: path.raw().to_string(),
                });
            }
        };
        let mut candidates = self.apply_selectors(first, start, document)?;

        let mut descend = false;
        for element in rest {
            if element.is_recursive_descent() {
                descend = true;
                continue;
            }
            if descend {
                candidates = candidates
                    .iter()
                    .flat_map(|location| descendants(location, document))
                    .collect();
                descend = false;
            }
            candidates = self.apply_element(element, candidates, document)?;
        }
        if descend {
            candidates = candidates
                .iter()
                .flat_map(|location| descendants(location, document))
                .collect();
        }

        log::trace!("'{}' matched {} node(s)", path, candidates.len());
        Ok(candidates)
    }
}

impl JsonPathFetcher {
    fn apply_element(
        &self,
        element: &PathElement,
        candidates: Vec<NodeLocation>,
        document: &JsonValue,
    ) -> Result<Vec<NodeLocation>, PathError> {
        let name = element.element_name();
        let named = match name {
            "" => candidates,
            WILDCARD => candidates
                .iter()
                .flat_map(|location| children(location, document))
                .collect(),
            "^" => candidates.iter().filter_map(NodeLocation::parent).collect(),
            _ => {
                let key = element.unquoted_name();
                candidates
                    .iter()
                    .filter_map(|location| match location.resolve(document)? {
                        JsonValue::Object(map) if map.contains_key(key) => Some(location.key(key)),
                        JsonValue::Array(items) => key
                            .parse::<usize>()
                            .ok()
                            .filter(|index| *index < items.len())
                            .map(|index| location.index(index)),
                        _ => None,
                    })
                    .collect()
            }
        };
        self.apply_selectors(element, named, document)
    }

    fn apply_selectors(
        &self,
        element: &PathElement,
        mut candidates: Vec<NodeLocation>,
        document: &JsonValue,
    ) -> Result<Vec<NodeLocation>, PathError> {
        for selector in element.selectors()? {
            let mut next = Vec::new();
            for location in &candidates {
                self.apply_selector(&selector, location, document, &mut next)?;
            }
            candidates = next;
        }
        Ok(candidates)
    }

    fn apply_selector(
        &self,
        selector: &Selector,
        location: &NodeLocation,
        document: &JsonValue,
        out: &mut Vec<NodeLocation>,
    ) -> Result<(), PathError> {
        let Some(node) = location.resolve(document) else {
            return Ok(());
        };

        match (selector, node) {
            (Selector::Name(key), JsonValue::Object(map)) => {
                if map.contains_key(key) {
                    out.push(location.key(key));
                }
            }
            (Selector::Index(index), JsonValue::Array(items)) => {
                if let Some(index) = normalize_index(*index, items.len()) {
                    out.push(location.index(index));
                }
            }
            (Selector::Wildcard, _) => out.extend(children(location, document)),
            (Selector::Slice { start, end }, JsonValue::Array(items)) => {
                let len = items.len() as i64;
                let clamp = |bound: i64| if bound < 0 { (len + bound).max(0) } else { bound.min(len) };
                let from = start.map(clamp).unwrap_or(0);
                let to = end.map(clamp).unwrap_or(len);
                out.extend((from..to).map(|index| location.index(index as usize)));
            }
            (Selector::Union(parts), _) => {
                for part in parts {
                    self.apply_selector(part, location, document, out)?;
                }
            }
            (Selector::Filter(filter), _) => {
                for child in children(location, document) {
                    if self.filter_matches(filter, &child, document)? {
                        out.push(child);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn filter_matches(
        &self,
        filter: &Filter,
        candidate: &NodeLocation,
        document: &JsonValue,
    ) -> Result<bool, PathError> {
        let subjects = self.select_tokens(&filter.subject, document, candidate)?;
        let Some((op, operand)) = &filter.comparison else {
            return Ok(!subjects.is_empty());
        };

        Ok(subjects
            .iter()
            .filter_map(|location| location.resolve(document))
            .any(|value| match (op, operand) {
                (FilterOp::Matches, FilterOperand::Pattern(regex)) => {
                    value.as_str().is_some_and(|s| regex.is_match(s))
                }
                (_, FilterOperand::Literal(literal)) => compare(*op, value, literal),
                _ => false,
            }))
    }
}

fn compare(op: FilterOp, left: &JsonValue, right: &JsonValue) -> bool {
    match op {
        FilterOp::Eq => values_equal(left, right),
        FilterOp::NotEq => !values_equal(left, right),
        FilterOp::Lt => compare_values(left, right) == Some(Ordering::Less),
        FilterOp::LtEq => matches!(compare_values(left, right), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Gt => compare_values(left, right) == Some(Ordering::Greater),
        FilterOp::GtEq => matches!(compare_values(left, right), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Matches => false,
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let index = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&index).then_some(index as usize)
}

/// Direct children: array items or object members, in order.
pub fn children(location: &NodeLocation, document: &JsonValue) -> Vec<NodeLocation> {
    match location.resolve(document) {
        Some(JsonValue::Array(items)) => (0..items.len()).map(|i| location.index(i)).collect(),
        Some(JsonValue::Object(map)) => map.keys().map(|key| location.key(key)).collect(),
        _ => Vec::new(),
    }
}

/// The node itself followed by every node below it, depth first.
pub fn descendants(location: &NodeLocation, document: &JsonValue) -> Vec<NodeLocation> {
    let mut found = vec![location.clone()];
    for child in children(location, document) {
        found.extend(descendants(&child, document));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select(path: &str, document: &JsonValue) -> Vec<String> {
        JsonPathFetcher
            .select_tokens(&Path::parse(path).unwrap(), document, &NodeLocation::root())
            .unwrap()
            .iter()
            .map(NodeLocation::normalized)
            .collect()
    }

    #[test]
    fn test_pointer_escapes() {
        let location = NodeLocation::root().key("a/b").key("c~d").index(2);
        assert_eq!(location.pointer(), "/a~1b/c~0d/2");
        assert_eq!(location.normalized(), "$['a/b']['c~d'][2]");
    }

    #[test]
    fn test_negative_index() {
        let doc = json!({"items": [1, 2, 3]});
        assert_eq!(select("$.items[-1]", &doc), vec!["$.items[2]"]);
        assert!(select("$.items[-4]", &doc).is_empty());
    }

    #[test]
    fn test_parent_element() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(select("$.a.b.^", &doc), vec!["$.a"]);
    }

    #[test]
    fn test_get_path() {
        let current = NodeLocation::root().key("orders").index(1);
        assert_eq!(JsonPathFetcher.get_path("@.id", &current), "$.orders[1].id");
        assert_eq!(JsonPathFetcher.get_path("^.count", &current), "$.orders.count");
        assert_eq!(JsonPathFetcher.get_path("$.x", &current), "$.x");
    }
}
