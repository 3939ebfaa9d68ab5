//! Path model.
//!
//! A path such as `$.orders[*].lines[?(@.qty > 1)].sku` is chopped on `.` into
//! [`PathElement`]s. Each element carries an optional name and an optional
//! bracketed array notation. An empty element (the gap in `$..sku`) marks
//! recursive descent.
//!
//! The full element list is the *selection path*, used to find existing nodes.
//! Everything but the last element is the *construction path*, used by
//! commands that create missing parents before writing the last name.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::PathError;
use crate::lexer::{self, PATH_LEVELS, chop, find_matching_close};

pub const ROOT_INDICATOR: char = '$';
pub const CURRENT_INDICATOR: char = '@';
pub const PARENT_INDICATOR: char = '^';
pub const PATH_DELIMITER: char = '.';
pub const ARRAY_OPEN: char = '[';
pub const ARRAY_CLOSE: char = ']';
pub const WILDCARD: &str = "*";

/// One dot-separated segment of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathElement {
    raw: String,
    /// Byte offset of the first `[` outside quotes.
    bracket: Option<usize>,
}

impl PathElement {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let bracket = first_unquoted_bracket(&raw);
        PathElement { raw, bracket }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Text before the first `[`.
    ///
    /// # Examples
    /// - `foo[2]` → `foo`
    /// - `[0]` → `` (bracket only, applies to the current node)
    pub fn element_name(&self) -> &str {
        match self.bracket {
            Some(at) => &self.raw[..at],
            None => &self.raw,
        }
    }

    /// Element name with one pair of surrounding quotes removed.
    pub fn unquoted_name(&self) -> &str {
        unquote(self.element_name())
    }

    /// Bracketed suffix including the brackets, e.g. `[2]`.
    pub fn array_notation(&self) -> Option<&str> {
        self.bracket.map(|at| &self.raw[at..])
    }

    /// Bracketed suffix without the outer brackets, e.g. `2`.
    pub fn array_notation_inner(&self) -> Option<&str> {
        let notation = self.array_notation()?;
        let inner = &notation[1..];
        Some(inner.strip_suffix(ARRAY_CLOSE).unwrap_or(inner))
    }

    pub fn has_array_indicator(&self) -> bool {
        self.array_notation()
            .is_some_and(|notation| notation.len() > 1 && notation.ends_with(ARRAY_CLOSE))
    }

    /// An empty element means "search every descendant level".
    pub fn is_recursive_descent(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_wildcard(&self) -> bool {
        self.element_name() == WILDCARD
    }

    /// Parses the bracket groups of this element, left to right.
    ///
    /// `foo[0][1]` yields two selectors; the name is not included.
    pub fn selectors(&self) -> Result<Vec<Selector>, PathError> {
        let Some(notation) = self.array_notation() else {
            return Ok(Vec::new());
        };

        let mut selectors = Vec::new();
        let mut at = 0;
        while at < notation.len() {
            let close = find_matching_close(notation, at, PATH_LEVELS)
                .ok_or_else(|| PathError::Unbalanced(self.raw.clone()))?;
            selectors.push(Selector::parse(&notation[at + 1..close], &self.raw)?);
            at = close + 1;
            if at < notation.len() && !notation[at..].starts_with(ARRAY_OPEN) {
                return Err(PathError::InvalidSelector {
                    path: self.raw.clone(),
                    selector: notation[at..].to_string(),
                    message: "unexpected text after ']'".to_string(),
                });
            }
        }
        Ok(selectors)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn first_unquoted_bracket(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (at, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ARRAY_OPEN) => return Some(at),
            _ => {}
        }
    }
    None
}

pub(crate) fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2
            && let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

/// A single bracket selector.
#[derive(Debug, Clone)]
pub enum Selector {
    /// `['name']`, or a bare `[name]`
    Name(String),
    /// `[2]`, `[-1]` (negative counts from the end)
    Index(i64),
    /// `[*]`
    Wildcard,
    /// `[start:end]`, either bound optional
    Slice { start: Option<i64>, end: Option<i64> },
    /// `[0,2]`, `['a','b']`
    Union(Vec<Selector>),
    /// `[?(@.qty > 1)]`
    Filter(Filter),
}

impl Selector {
    fn parse(inner: &str, element: &str) -> Result<Selector, PathError> {
        let inner = inner.trim();
        let invalid = |message: &str| PathError::InvalidSelector {
            path: element.to_string(),
            selector: inner.to_string(),
            message: message.to_string(),
        };

        if inner.is_empty() {
            return Err(invalid("empty brackets"));
        }
        if inner == WILDCARD {
            return Ok(Selector::Wildcard);
        }
        if let Some(condition) = inner.strip_prefix('?') {
            return Filter::parse(condition.trim(), element).map(Selector::Filter);
        }

        let parts = chop(inner, &[','], PATH_LEVELS);
        if parts.len() > 1 {
            return parts
                .iter()
                .map(|part| Selector::parse(part, element))
                .collect::<Result<Vec<_>, _>>()
                .map(Selector::Union);
        }

        if inner.starts_with(['\'', '"']) {
            return Ok(Selector::Name(unquote(inner).to_string()));
        }

        if inner.contains(':') {
            let bounds = chop(inner, &[':'], PATH_LEVELS);
            let bound = |text: Option<&String>| -> Result<Option<i64>, PathError> {
                match text.map(|t| t.as_str()) {
                    None | Some("") => Ok(None),
                    Some(t) => t
                        .parse::<i64>()
                        .map(Some)
                        .map_err(|_| invalid("slice bounds must be integers")),
                }
            };
            return Ok(Selector::Slice {
                start: bound(bounds.first())?,
                end: bound(bounds.get(1))?,
            });
        }

        match inner.parse::<i64>() {
            Ok(index) => Ok(Selector::Index(index)),
            Err(_) => Ok(Selector::Name(inner.to_string())),
        }
    }
}

/// Comparison used inside a filter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Matches,
}

impl FilterOp {
    // Two-char operators first so `<=` isn't read as `<`.
    const ALL: [(&'static str, FilterOp); 7] = [
        ("==", FilterOp::Eq),
        ("!=", FilterOp::NotEq),
        ("<=", FilterOp::LtEq),
        (">=", FilterOp::GtEq),
        ("=~", FilterOp::Matches),
        ("<", FilterOp::Lt),
        (">", FilterOp::Gt),
    ];
}

/// The right-hand side of a filter comparison.
#[derive(Debug, Clone)]
pub enum FilterOperand {
    Literal(JsonValue),
    Pattern(Regex),
}

/// `?(@.path)` or `?(@.path op operand)`.
#[derive(Debug, Clone)]
pub struct Filter {
    pub subject: Path,
    pub comparison: Option<(FilterOp, FilterOperand)>,
}

impl Filter {
    fn parse(condition: &str, element: &str) -> Result<Filter, PathError> {
        let invalid = |message: String| PathError::InvalidSelector {
            path: element.to_string(),
            selector: condition.to_string(),
            message,
        };

        let body = condition
            .strip_prefix('(')
            .and_then(|c| c.strip_suffix(')'))
            .unwrap_or(condition)
            .trim();

        let Some((at, op_text, op)) = find_filter_op(body) else {
            return Ok(Filter {
                subject: Path::parse(body)?,
                comparison: None,
            });
        };

        let subject = Path::parse(body[..at].trim())?;
        let operand_text = body[at + op_text.len()..].trim();
        let operand = if op == FilterOp::Matches {
            let pattern = unquote(operand_text);
            Regex::new(pattern)
                .map(FilterOperand::Pattern)
                .map_err(|e| invalid(format!("invalid pattern: {}", e)))?
        } else if operand_text.starts_with('\'') {
            FilterOperand::Literal(JsonValue::String(unquote(operand_text).to_string()))
        } else {
            serde_json::from_str(operand_text)
                .map(FilterOperand::Literal)
                .map_err(|_| invalid(format!("'{}' is not a literal", operand_text)))?
        };

        Ok(Filter {
            subject,
            comparison: Some((op, operand)),
        })
    }
}

fn find_filter_op(body: &str) -> Option<(usize, &'static str, FilterOp)> {
    let mut quote: Option<char> = None;
    for (at, ch) in body.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, _) => {
                let rest = &body[at..];
                if let Some((text, op)) = FilterOp::ALL.iter().find(|(text, _)| rest.starts_with(*text)) {
                    return Some((at, *text, *op));
                }
            }
        }
    }
    None
}

/// A parsed path: the ordered element list plus its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    raw: String,
    elements: Vec<PathElement>,
}

impl Path {
    /// Chops `raw` into elements without checking syntax.
    pub fn new(raw: &str) -> Self {
        let elements = chop(raw, &[PATH_DELIMITER], PATH_LEVELS)
            .into_iter()
            .map(PathElement::new)
            .collect();
        Path {
            raw: raw.to_string(),
            elements,
        }
    }

    /// Chops and validates `raw`: it must start with a root, current or parent
    /// indicator, be balanced, and have parseable selectors.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if !raw.starts_with([ROOT_INDICATOR, CURRENT_INDICATOR, PARENT_INDICATOR]) {
            return Err(PathError::MissingRoot { path: raw.to_string() });
        }
        if !lexer::is_balanced(raw, PATH_LEVELS) {
            return Err(PathError::Unbalanced(raw.to_string()));
        }

        let path = Path::new(raw);
        for element in &path.elements {
            element.selectors()?;
        }
        Ok(path)
    }

    /// Like [`Path::parse`], but a bare `id` or `a.b` is read as `@.id`.
    pub fn parse_relative(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.starts_with([ROOT_INDICATOR, CURRENT_INDICATOR, PARENT_INDICATOR]) {
            Path::parse(raw)
        } else {
            Path::parse(&format!("{}{}{}", CURRENT_INDICATOR, PATH_DELIMITER, raw))
        }
    }

    /// Builds a path from already-chopped elements.
    pub fn from_elements(elements: &[PathElement]) -> Self {
        let raw = elements
            .iter()
            .map(PathElement::raw)
            .collect::<Vec<_>>()
            .join(&PATH_DELIMITER.to_string());
        Path {
            raw,
            elements: elements.to_vec(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Every element; locates existing nodes.
    pub fn selection_path(&self) -> &[PathElement] {
        &self.elements
    }

    /// All elements but the last; locates (or creates) the parents.
    pub fn construction_path(&self) -> &[PathElement] {
        match self.elements.split_last() {
            Some((_, parents)) => parents,
            None => &[],
        }
    }

    /// The construction path as a standalone [`Path`].
    pub fn parent(&self) -> Path {
        Path::from_elements(self.construction_path())
    }

    pub fn last_element(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Name of the last element, quotes removed.
    pub fn last_name(&self) -> &str {
        self.last_element().map(PathElement::unquoted_name).unwrap_or("")
    }

    pub fn is_relative(&self) -> bool {
        self.raw.starts_with([CURRENT_INDICATOR, PARENT_INDICATOR])
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}
