//! Structural comparison of two JSON sub-trees.
//!
//! Both sides are walked together by shape. Objects compare by the union of
//! their property names, arrays by position unless a [`CompareArraySettings`]
//! entry gives key paths for that array, in which case elements are paired by
//! key and order no longer matters. Leaves compare by type and value, with
//! numbers compared numerically.
//!
//! ```
//! use clove_script::compare::{compare, CompareSettings, DifferenceType};
//! use clove_script::JsonPathFetcher;
//! use serde_json::json;
//!
//! let results = compare(&json!({"a": 1}), &json!({"a": 2}), &CompareSettings::default(), &JsonPathFetcher).unwrap();
//! let differences: Vec<_> = results.differences().collect();
//! assert_eq!(differences.len(), 1);
//! assert_eq!(differences[0].difference_type, DifferenceType::Changed);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::PathError;
use crate::fetcher::{ItemFetcher, NodeLocation, Step};
use crate::json::{canonical_text, type_name, values_equal};
use crate::path::{Path, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifferenceType {
    Equal,
    Added,
    Removed,
    Changed,
    TypeChanged,
    /// Two elements of one array share a key under unique index matching.
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifferenceSubType {
    Value,
    Property,
    ArrayItem,
    Key,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    pub is_difference: bool,
    pub difference_type: DifferenceType,
    pub difference_sub_type: DifferenceSubType,
    pub left_path: Option<String>,
    pub right_path: Option<String>,
    pub left_value: Option<JsonValue>,
    pub right_value: Option<JsonValue>,
    /// The key filter used to pair this element, for keyed arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_filter: Option<String>,
}

/// Everything one comparison produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompareResults {
    pub results: Vec<CompareResult>,
    /// Problems worth logging, such as duplicate keys.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl CompareResults {
    pub fn differences(&self) -> impl Iterator<Item = &CompareResult> {
        self.results.iter().filter(|result| result.is_difference)
    }

    pub fn has_differences(&self) -> bool {
        self.differences().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareSettings {
    /// Allow-list of reported types; empty reports everything.
    pub result_types: Vec<DifferenceType>,
    pub array_settings: Vec<CompareArraySettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareArraySettings {
    /// Which array this applies to, relative to the compared node
    /// (`$.orders`, `$.orders[*].lines`, `$..lines`).
    pub array_path: String,
    /// Paths inside each element whose values identify it (`id`, `@.sku`).
    pub key_paths: Vec<String>,
    /// Each key combination must occur at most once per array.
    pub unique_index_matching: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum PatternToken {
    /// `None` matches any key or index.
    Key(Option<String>),
    /// `None` matches any index.
    Index(Option<i64>),
    AnyDepth,
}

#[derive(Debug)]
struct ArrayRule {
    pattern: Vec<PatternToken>,
    key_paths: Vec<Path>,
    unique: bool,
}

impl ArrayRule {
    fn compile(settings: &CompareArraySettings) -> Result<Self, PathError> {
        let path = Path::parse_relative(&settings.array_path)?;
        let mut pattern = Vec::new();
        for element in path.elements().iter().skip(1) {
            if element.is_recursive_descent() {
                pattern.push(PatternToken::AnyDepth);
                continue;
            }
            match element.element_name() {
                "" => {}
                "*" => pattern.push(PatternToken::Key(None)),
                _ => pattern.push(PatternToken::Key(Some(element.unquoted_name().to_string()))),
            }
            for selector in element.selectors()? {
                pattern.push(match selector {
                    Selector::Index(index) => PatternToken::Index(Some(index)),
                    Selector::Name(name) => PatternToken::Key(Some(name)),
                    _ => PatternToken::Index(None),
                });
            }
        }

        let key_paths = settings
            .key_paths
            .iter()
            .map(|key| Path::parse_relative(key))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ArrayRule {
            pattern,
            key_paths,
            unique: settings.unique_index_matching,
        })
    }

    fn matches(&self, steps: &[Step]) -> bool {
        matches_pattern(&self.pattern, steps)
    }
}

fn matches_pattern(pattern: &[PatternToken], steps: &[Step]) -> bool {
    match (pattern.split_first(), steps.split_first()) {
        (None, None) => true,
        (Some((PatternToken::AnyDepth, rest)), _) => {
            (0..=steps.len()).any(|skip| matches_pattern(rest, &steps[skip..]))
        }
        (Some((token, rest)), Some((step, remaining))) => {
            let step_matches = match (token, step) {
                (PatternToken::Key(None), _) => true,
                (PatternToken::Key(Some(name)), Step::Key(key)) => name == key,
                (PatternToken::Index(None), Step::Index(_)) => true,
                (PatternToken::Index(Some(wanted)), Step::Index(index)) => *wanted == *index as i64,
                _ => false,
            };
            step_matches && matches_pattern(rest, remaining)
        }
        _ => false,
    }
}

/// Walks two trees and collects [`CompareResult`]s.
pub struct Comparer<'f> {
    rules: Vec<ArrayRule>,
    result_types: Vec<DifferenceType>,
    fetcher: &'f dyn ItemFetcher,
}

/// One side of the walk: the document, where we are in it, and where we are
/// relative to the node the comparison started from.
#[derive(Clone, Copy)]
struct Side<'a> {
    document: &'a JsonValue,
    location: &'a NodeLocation,
}

impl<'f> Comparer<'f> {
    pub fn new(settings: &CompareSettings, fetcher: &'f dyn ItemFetcher) -> Result<Self, PathError> {
        let rules = settings
            .array_settings
            .iter()
            .map(ArrayRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Comparer {
            rules,
            result_types: settings.result_types.clone(),
            fetcher,
        })
    }

    /// Compares the nodes at `left` and `right`, which may live in different
    /// documents.
    pub fn compare_locations(
        &self,
        left_document: &JsonValue,
        left: &NodeLocation,
        right_document: &JsonValue,
        right: &NodeLocation,
        results: &mut CompareResults,
    ) {
        let left_side = Side {
            document: left_document,
            location: left,
        };
        let right_side = Side {
            document: right_document,
            location: right,
        };
        self.compare_nodes(left_side, right_side, &[], None, results);
    }

    fn push(&self, results: &mut CompareResults, result: CompareResult) {
        if self.result_types.is_empty() || self.result_types.contains(&result.difference_type) {
            results.results.push(result);
        }
    }

    fn compare_nodes(
        &self,
        left: Side<'_>,
        right: Side<'_>,
        relative: &[Step],
        array_filter: Option<String>,
        results: &mut CompareResults,
    ) {
        let (Some(left_value), Some(right_value)) = (
            left.location.resolve(left.document),
            right.location.resolve(right.document),
        ) else {
            return;
        };

        match (left_value, right_value) {
            (JsonValue::Object(left_map), JsonValue::Object(right_map)) => {
                for (key, value) in left_map {
                    let left_child = left.location.key(key);
                    let mut relative_child = relative.to_vec();
                    relative_child.push(Step::Key(key.clone()));
                    if right_map.contains_key(key) {
                        let right_child = right.location.key(key);
                        self.compare_nodes(
                            Side { document: left.document, location: &left_child },
                            Side { document: right.document, location: &right_child },
                            &relative_child,
                            array_filter.clone(),
                            results,
                        );
                    } else {
                        self.push(
                            results,
                            removed(&left_child, value, DifferenceSubType::Property, array_filter.clone()),
                        );
                    }
                }
                for (key, value) in right_map {
                    if !left_map.contains_key(key) {
                        self.push(
                            results,
                            added(&right.location.key(key), value, DifferenceSubType::Property, array_filter.clone()),
                        );
                    }
                }
            }
            (JsonValue::Array(left_items), JsonValue::Array(right_items)) => {
                match self.rules.iter().find(|rule| rule.matches(relative)) {
                    Some(rule) if !rule.key_paths.is_empty() => {
                        self.compare_keyed(rule, left, left_items, right, right_items, relative, results)
                    }
                    _ => self.compare_positional(left, left_items, right, right_items, relative, results),
                }
            }
            (left_value, right_value) if type_name(left_value) != type_name(right_value) => {
                self.push(
                    results,
                    leaf(DifferenceType::TypeChanged, left, left_value, right, right_value, array_filter),
                );
            }
            (left_value, right_value) => {
                let difference_type = if values_equal(left_value, right_value) {
                    DifferenceType::Equal
                } else {
                    DifferenceType::Changed
                };
                self.push(
                    results,
                    leaf(difference_type, left, left_value, right, right_value, array_filter),
                );
            }
        }
    }

    fn compare_positional(
        &self,
        left: Side<'_>,
        left_items: &[JsonValue],
        right: Side<'_>,
        right_items: &[JsonValue],
        relative: &[Step],
        results: &mut CompareResults,
    ) {
        for index in 0..left_items.len().max(right_items.len()) {
            let left_child = left.location.index(index);
            let right_child = right.location.index(index);
            match (left_items.get(index), right_items.get(index)) {
                (Some(_), Some(_)) => {
                    let mut relative_child = relative.to_vec();
                    relative_child.push(Step::Index(index));
                    self.compare_nodes(
                        Side { document: left.document, location: &left_child },
                        Side { document: right.document, location: &right_child },
                        &relative_child,
                        None,
                        results,
                    );
                }
                (Some(value), None) => self.push(results, removed(&left_child, value, DifferenceSubType::ArrayItem, None)),
                (None, Some(value)) => self.push(results, added(&right_child, value, DifferenceSubType::ArrayItem, None)),
                (None, None) => {}
            }
        }
    }

    /// Identity of an element: its key-path values, or `None` when it has
    /// none of them.
    fn element_key(&self, rule: &ArrayRule, element: &JsonValue) -> Option<(String, Vec<JsonValue>)> {
        let values: Vec<Option<JsonValue>> = rule
            .key_paths
            .iter()
            .map(|path| {
                self.fetcher
                    .select_token(path, element, &NodeLocation::root())
                    .ok()
                    .flatten()
                    .and_then(|location| location.resolve(element).cloned())
            })
            .collect();
        if values.iter().all(Option::is_none) {
            return None;
        }
        let values: Vec<JsonValue> = values.into_iter().map(Option::unwrap_or_default).collect();
        let text = canonical_text(&JsonValue::Array(values.clone()));
        Some((text, values))
    }

    fn key_filter(rule: &ArrayRule, values: &[JsonValue]) -> String {
        let conditions: Vec<String> = rule
            .key_paths
            .iter()
            .zip(values)
            .map(|(path, value)| format!("{} == {}", path, value))
            .collect();
        format!("[?({})]", conditions.join(" && "))
    }

    #[allow(clippy::too_many_arguments)]
    fn compare_keyed(
        &self,
        rule: &ArrayRule,
        left: Side<'_>,
        left_items: &[JsonValue],
        right: Side<'_>,
        right_items: &[JsonValue],
        relative: &[Step],
        results: &mut CompareResults,
    ) {
        let left_keys: Vec<_> = left_items.iter().map(|item| self.element_key(rule, item)).collect();
        let right_keys: Vec<_> = right_items.iter().map(|item| self.element_key(rule, item)).collect();

        let mut right_index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, key) in right_keys.iter().enumerate() {
            if let Some((text, _)) = key {
                right_index.entry(text.as_str()).or_default().push(index);
            }
        }

        let mut skip_left = vec![false; left_items.len()];
        let mut skip_right = vec![false; right_items.len()];
        if rule.unique {
            self.flag_duplicates(&left_keys, left, left_items, &mut skip_left, results);
            self.flag_duplicates(&right_keys, right, right_items, &mut skip_right, results);
        }

        let mut used_right = skip_right.clone();
        for (index, key) in left_keys.iter().enumerate() {
            if skip_left[index] {
                continue;
            }
            let left_child = left.location.index(index);
            let partner = key.as_ref().and_then(|(text, values)| {
                right_index
                    .get(text.as_str())?
                    .iter()
                    .find(|candidate| !used_right[**candidate])
                    .map(|candidate| (*candidate, values))
            });

            match partner {
                Some((right_position, values)) => {
                    used_right[right_position] = true;
                    let right_child = right.location.index(right_position);
                    let mut relative_child = relative.to_vec();
                    relative_child.push(Step::Index(index));
                    self.compare_nodes(
                        Side { document: left.document, location: &left_child },
                        Side { document: right.document, location: &right_child },
                        &relative_child,
                        Some(Self::key_filter(rule, values)),
                        results,
                    );
                }
                None => self.push(
                    results,
                    removed(&left_child, &left_items[index], DifferenceSubType::ArrayItem, None),
                ),
            }
        }

        for (index, value) in right_items.iter().enumerate() {
            if !used_right[index] {
                self.push(
                    results,
                    added(&right.location.index(index), value, DifferenceSubType::ArrayItem, None),
                );
            }
        }
    }

    fn flag_duplicates(
        &self,
        keys: &[Option<(String, Vec<JsonValue>)>],
        side: Side<'_>,
        items: &[JsonValue],
        skip: &mut [bool],
        results: &mut CompareResults,
    ) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (index, key) in keys.iter().enumerate() {
            let Some((text, _)) = key else { continue };
            if let Some(first) = seen.get(text.as_str()) {
                skip[index] = true;
                let location = side.location.index(index);
                results.warnings.push(format!(
                    "duplicate key {} at {} (first seen at index {})",
                    text, location, first
                ));
                self.push(
                    results,
                    CompareResult {
                        is_difference: true,
                        difference_type: DifferenceType::Duplicate,
                        difference_sub_type: DifferenceSubType::Key,
                        left_path: Some(location.normalized()),
                        right_path: None,
                        left_value: Some(items[index].clone()),
                        right_value: None,
                        array_filter: None,
                    },
                );
            } else {
                seen.insert(text.as_str(), index);
            }
        }
    }
}

fn leaf(
    difference_type: DifferenceType,
    left: Side<'_>,
    left_value: &JsonValue,
    right: Side<'_>,
    right_value: &JsonValue,
    array_filter: Option<String>,
) -> CompareResult {
    CompareResult {
        is_difference: difference_type != DifferenceType::Equal,
        difference_type,
        difference_sub_type: DifferenceSubType::Value,
        left_path: Some(left.location.normalized()),
        right_path: Some(right.location.normalized()),
        left_value: Some(left_value.clone()),
        right_value: Some(right_value.clone()),
        array_filter,
    }
}

fn removed(
    location: &NodeLocation,
    value: &JsonValue,
    sub_type: DifferenceSubType,
    array_filter: Option<String>,
) -> CompareResult {
    CompareResult {
        is_difference: true,
        difference_type: DifferenceType::Removed,
        difference_sub_type: sub_type,
        left_path: Some(location.normalized()),
        right_path: None,
        left_value: Some(value.clone()),
        right_value: None,
        array_filter,
    }
}

fn added(
    location: &NodeLocation,
    value: &JsonValue,
    sub_type: DifferenceSubType,
    array_filter: Option<String>,
) -> CompareResult {
    CompareResult {
        is_difference: true,
        difference_type: DifferenceType::Added,
        difference_sub_type: sub_type,
        left_path: None,
        right_path: Some(location.normalized()),
        left_value: None,
        right_value: Some(value.clone()),
        array_filter,
    }
}

/// Compares two standalone documents from their roots.
pub fn compare(
    left: &JsonValue,
    right: &JsonValue,
    settings: &CompareSettings,
    fetcher: &dyn ItemFetcher,
) -> Result<CompareResults, PathError> {
    let comparer = Comparer::new(settings, fetcher)?;
    let mut results = CompareResults::default();
    let root = NodeLocation::root();
    comparer.compare_locations(left, &root, right, &root, &mut results);
    Ok(results)
}

/// Compares matched sub-trees of one document pairwise, in match order.
/// Surplus matches on either side are reported as removed or added.
pub fn compare_matches(
    document: &JsonValue,
    left: &[NodeLocation],
    right: &[NodeLocation],
    settings: &CompareSettings,
    fetcher: &dyn ItemFetcher,
) -> Result<CompareResults, PathError> {
    let comparer = Comparer::new(settings, fetcher)?;
    let mut results = CompareResults::default();
    for index in 0..left.len().max(right.len()) {
        match (left.get(index), right.get(index)) {
            (Some(l), Some(r)) => comparer.compare_locations(document, l, document, r, &mut results),
            (Some(l), None) => {
                if let Some(value) = l.resolve(document) {
                    comparer.push(&mut results, removed(l, value, DifferenceSubType::Value, None));
                }
            }
            (None, Some(r)) => {
                if let Some(value) = r.resolve(document) {
                    comparer.push(&mut results, added(r, value, DifferenceSubType::Value, None));
                }
            }
            (None, None) => {}
        }
    }
    Ok(results)
}
