//! Delimiter-level tokenizer.
//!
//! Paths and function argument lists are split on a delimiter only where the
//! delimiter sits at nesting depth zero. Nesting is described by [`LevelPair`]s:
//! brackets nest, quotes don't, and a quote closes on its own character.
//!
//! ```
//! use clove_script::lexer::{chop, ARGUMENT_LEVELS};
//!
//! let parts = chop("demo[demo2,demo3],demo4", &[','], ARGUMENT_LEVELS);
//! assert_eq!(parts, vec!["demo[demo2,demo3]", "demo4"]);
//! ```

/// Leading character marking a value string as a function call (`#name(...)`).
pub const FUNCTION_MARKER: char = '#';

/// Opens a function's argument list.
pub const ARGUMENT_OPEN: char = '(';

/// Closes a function's argument list.
pub const ARGUMENT_CLOSE: char = ')';

/// Separates function arguments.
pub const ARGUMENT_DELIMITER: char = ',';

/// A bracket or quote pair the tokenizer tracks as a nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPair {
    pub open: char,
    pub close: char,
    /// Whether other levels may open inside this one. Quotes forbid it, so
    /// brackets inside a quoted string are plain content.
    pub sub_levels_allowed: bool,
}

impl LevelPair {
    pub const fn new(open: char, close: char, sub_levels_allowed: bool) -> Self {
        LevelPair {
            open,
            close,
            sub_levels_allowed,
        }
    }

    /// Quote-like pairs open and close on the same character.
    pub fn is_symmetric(&self) -> bool {
        self.open == self.close
    }
}

/// Levels registered for path text: brackets, filter parentheses and quotes.
pub const PATH_LEVELS: &[LevelPair] = &[
    LevelPair::new('[', ']', true),
    LevelPair::new('(', ')', true),
    LevelPair::new('\'', '\'', false),
    LevelPair::new('"', '"', false),
];

/// Levels registered for function argument lists. Same as paths, so a path
/// argument like `$.items[?(@.a, 1)]` stays in one piece.
pub const ARGUMENT_LEVELS: &[LevelPair] = PATH_LEVELS;

/// Scans text left to right keeping a LIFO stack of open levels and records
/// where the delimiters sit at depth zero.
pub struct Chopper<'a> {
    input: Vec<char>,
    position: usize,
    delimiters: &'a [char],
    levels: &'a [LevelPair],
    stack: Vec<LevelPair>,
    splits: Vec<usize>,
}

impl<'a> Chopper<'a> {
    pub fn new(text: &str, delimiters: &'a [char], levels: &'a [LevelPair]) -> Self {
        Chopper {
            input: text.chars().collect(),
            position: 0,
            delimiters,
            levels,
            stack: Vec::new(),
            splits: Vec::new(),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn track_level(&mut self, ch: char) {
        if let Some(top) = self.stack.last() {
            // A close only ever pops the level on top of the stack.
            if top.close == ch {
                self.stack.pop();
                return;
            }
            if !top.sub_levels_allowed {
                return;
            }
        }

        if let Some(pair) = self.levels.iter().find(|pair| pair.open == ch) {
            self.stack.push(*pair);
        }
    }

    /// Runs the scan and returns the depth-zero delimiter positions.
    pub fn scan(&mut self) -> &[usize] {
        while let Some(ch) = self.current_char() {
            if self.stack.is_empty() && self.delimiters.contains(&ch) {
                self.splits.push(self.position);
            } else {
                self.track_level(ch);
            }
            self.advance();
        }
        &self.splits
    }

    /// Splits the text into its depth-zero segments.
    ///
    /// Each segment is trimmed. A final segment that is empty after trimming
    /// is dropped (`a,` and `a, ` both give `["a"]`), while two adjacent
    /// delimiters do produce an empty one (`$..name` keeps its
    /// recursive-descent marker).
    pub fn chop(mut self) -> Vec<String> {
        if self.input.is_empty() {
            return Vec::new();
        }
        self.scan();

        let mut segments = Vec::with_capacity(self.splits.len() + 1);
        let mut start = 0;
        for &split in &self.splits {
            segments.push(self.segment(start, split));
            start = split + 1;
        }
        if start < self.input.len() {
            let last = self.segment(start, self.input.len());
            if !last.is_empty() {
                segments.push(last);
            }
        }
        segments
    }

    fn segment(&self, start: usize, end: usize) -> String {
        self.input[start..end]
            .iter()
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Splits `text` on any of `delimiters` wherever no level is open.
pub fn chop(text: &str, delimiters: &[char], levels: &[LevelPair]) -> Vec<String> {
    Chopper::new(text, delimiters, levels).chop()
}

/// True when every level opened in `text` is closed again.
pub fn is_balanced(text: &str, levels: &[LevelPair]) -> bool {
    let mut chopper = Chopper::new(text, &[], levels);
    chopper.scan();
    chopper.depth() == 0
}

/// Returns the byte offset of the char closing the level opened at byte
/// offset `from`, honouring nested levels and quotes.
pub fn find_matching_close(text: &str, from: usize, levels: &[LevelPair]) -> Option<usize> {
    let first = text.get(from..)?.chars().next()?;
    let pair = levels.iter().find(|pair| pair.open == first)?;

    let mut chopper = Chopper::new("", &[], levels);
    for (offset, ch) in text[from..].char_indices() {
        chopper.track_level(ch);
        if chopper.depth() == 0 {
            return (ch == pair.close && offset > 0).then_some(from + offset);
        }
    }
    None
}

#[test]
fn test_chop_plain_commas() {
    assert_eq!(chop("demo, demo2", &[','], &[]), vec!["demo", "demo2"]);
}

#[test]
fn test_chop_quotes_do_not_nest() {
    // '[' inside the quote is content, so the quote still closes normally.
    assert_eq!(
        chop("'a[b',c", &[','], ARGUMENT_LEVELS),
        vec!["'a[b'", "c"]
    );
}

#[test]
fn test_find_matching_close() {
    assert_eq!(find_matching_close("(a,(b))x", 0, ARGUMENT_LEVELS), Some(6));
    assert_eq!(find_matching_close("(a,')')", 0, ARGUMENT_LEVELS), Some(6));
    assert_eq!(find_matching_close("(a,b", 0, ARGUMENT_LEVELS), None);
}
