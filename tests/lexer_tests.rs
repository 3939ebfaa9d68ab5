#[cfg(test)]
mod tests {
    use clove_script::lexer::{
        ARGUMENT_LEVELS, LevelPair, PATH_LEVELS, chop, find_matching_close, is_balanced,
    };

    const BRACKETS: &[LevelPair] = &[LevelPair::new('[', ']', true)];
    const QUOTES: &[LevelPair] = &[LevelPair::new('\'', '\'', false)];

    // ========================================================================
    // Basic Splitting Tests
    // ========================================================================

    #[test]
    fn test_chop_simple_list() {
        assert_eq!(chop("demo, demo2", &[','], ARGUMENT_LEVELS), vec!["demo", "demo2"]);
    }

    #[test]
    fn test_chop_without_delimiters_is_single_element() {
        assert_eq!(chop("justtext", &[','], ARGUMENT_LEVELS), vec!["justtext"]);
    }

    #[test]
    fn test_chop_empty_input() {
        assert!(chop("", &[','], ARGUMENT_LEVELS).is_empty());
    }

    #[test]
    fn test_chop_trailing_delimiter_dropped() {
        assert_eq!(chop("a,b,", &[','], &[]), vec!["a", "b"]);
    }

    #[test]
    fn test_chop_trailing_whitespace_segment_dropped() {
        assert_eq!(chop("a, ", &[','], ARGUMENT_LEVELS), vec!["a"]);
        assert_eq!(chop("a,  \t", &[','], ARGUMENT_LEVELS), vec!["a"]);
    }

    #[test]
    fn test_chop_adjacent_delimiters_keep_empty_segment() {
        assert_eq!(chop("$..name", &['.'], PATH_LEVELS), vec!["$", "", "name"]);
    }

    #[test]
    fn test_chop_multiple_delimiter_chars() {
        assert_eq!(chop("a;b,c", &[',', ';'], &[]), vec!["a", "b", "c"]);
    }

    // ========================================================================
    // Level Tracking Tests
    // ========================================================================

    #[test]
    fn test_chop_comma_inside_brackets() {
        assert_eq!(
            chop("demo[demo2,demo3],demo4", &[','], BRACKETS),
            vec!["demo[demo2,demo3]", "demo4"]
        );
    }

    #[test]
    fn test_chop_comma_inside_quotes() {
        assert_eq!(chop("'demo, demo3'", &[','], QUOTES), vec!["'demo, demo3'"]);
    }

    #[test]
    fn test_chop_nested_brackets_and_parens() {
        assert_eq!(
            chop("#f(a,[1,2]),#g((b,c))", &[','], ARGUMENT_LEVELS),
            vec!["#f(a,[1,2])", "#g((b,c))"]
        );
    }

    #[test]
    fn test_chop_bracket_inside_quote_is_literal() {
        assert_eq!(
            chop("'a]b',c", &[','], ARGUMENT_LEVELS),
            vec!["'a]b'", "c"]
        );
    }

    #[test]
    fn test_chop_path_dots_inside_quotes_and_filters() {
        assert_eq!(
            chop("$.'a.b'.items[?(@.x == 1)].c", &['.'], PATH_LEVELS),
            vec!["$", "'a.b'", "items[?(@.x == 1)]", "c"]
        );
    }

    #[test]
    fn test_chop_rejoin_reconstructs_text() {
        let text = "a,[b,c],'d,e',(f,g)";
        let parts = chop(text, &[','], ARGUMENT_LEVELS);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.join(","), text);
    }

    #[test]
    fn test_chop_delimiter_while_nested_does_not_split() {
        assert_eq!(chop("[a,b", &[','], BRACKETS), vec!["[a,b"]);
    }

    // ========================================================================
    // Level Pair Tests
    // ========================================================================

    #[test]
    fn test_level_pair_symmetry() {
        assert!(LevelPair::new('"', '"', false).is_symmetric());
        assert!(!LevelPair::new('[', ']', true).is_symmetric());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("$.a[0]['x']", PATH_LEVELS));
        assert!(!is_balanced("$.a[0", PATH_LEVELS));
        assert!(!is_balanced("$.'open", PATH_LEVELS));
        assert!(is_balanced("$.'a[b'", PATH_LEVELS));
    }

    #[test]
    fn test_find_matching_close() {
        assert_eq!(find_matching_close("#f(a,(b))x", 2, ARGUMENT_LEVELS), Some(8));
        assert_eq!(find_matching_close("(')')", 0, ARGUMENT_LEVELS), Some(4));
        assert_eq!(find_matching_close("(a", 0, ARGUMENT_LEVELS), None);
        assert_eq!(find_matching_close("a(b)", 0, ARGUMENT_LEVELS), None);
    }
}
