#[cfg(test)]
mod tests {
    use clove_script::context::LogLevel;
    use clove_script::validation::codes;
    use clove_script::*;
    use serde_json::{Value as JsonValue, json};

    fn run(script: JsonValue, document: JsonValue) -> ExecutionResult {
        ScriptEngine::default().run(&script.to_string(), document)
    }

    fn run_ok(script: JsonValue, document: JsonValue) -> JsonValue {
        let result = run(script, document);
        assert!(result.success, "run failed: {:?}", result.log_entries);
        result.document
    }

    fn warnings(result: &ExecutionResult) -> usize {
        result
            .log_entries
            .iter()
            .filter(|entry| entry.level == LogLevel::Warning)
            .count()
    }

    // ========================================================================
    // Parsing & Validation Tests
    // ========================================================================

    #[test]
    fn test_unknown_command_is_an_error() {
        let result = ScriptEngine::default().validate(r#"[{"command": "explode", "path": "$.a"}]"#);
        assert!(!result.success());
        assert!(result.has_code("Command.Unknown"));
        assert_eq!(result.issues[0].command_index, Some(0));
        assert_eq!(result.issues[0].location, "/0/command");
    }

    #[test]
    fn test_unknown_command_allowed_is_skipped() {
        let engine = ScriptEngine::new(ScriptSettings {
            allow_unknown_commands: true,
            ..ScriptSettings::default()
        });
        let script = json!([
            {"command": "explode"},
            {"command": "put", "path": "$.a", "value": 1}
        ]);
        let parsed = engine.parse(&script.to_string()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.validation().has_code(codes::COMMAND_UNKNOWN));

        let result = parsed.execute(json!({}));
        assert!(result.success);
        assert_eq!(result.document, json!({"a": 1}));
    }

    #[test]
    fn test_invalid_json() {
        let result = ScriptEngine::default().validate("[{");
        assert!(result.has_code(codes::SCRIPT_INVALID_JSON));
    }

    #[test]
    fn test_command_shape_issues() {
        let result = ScriptEngine::default().validate(r#"[1, {"path": "$.a"}, {"command": 5}]"#);
        assert!(result.has_code(codes::COMMAND_NOT_OBJECT));
        assert_eq!(
            result.issues.iter().filter(|i| i.code == codes::COMMAND_MISSING_NAME).count(),
            2
        );
    }

    #[test]
    fn test_every_issue_is_reported() {
        let script = json!([
            {"command": "add", "value": 1},
            {"command": "set", "path": "no-root", "value": 1},
            {"command": "put", "path": "$.a", "value": "#nothing()"},
            {"command": "put", "path": "$.a", "value": "#upper()"},
            {"command": "merge", "path": "$.a", "value": {}, "settings": {"arrayHandling": "shuffle"}},
            {"command": "rename", "path": "$.a", "name": 7}
        ]);
        let result = ScriptEngine::default().validate(&script.to_string());
        let found: Vec<_> = result.issues.iter().map(|i| (i.command_index, i.code.as_str())).collect();
        assert_eq!(
            found,
            vec![
                (Some(0), codes::PROPERTY_MISSING),
                (Some(1), codes::PATH_INVALID),
                (Some(2), codes::FUNCTION_UNKNOWN),
                (Some(3), codes::FUNCTION_ARITY),
                (Some(4), codes::SETTINGS_INVALID),
                (Some(5), codes::PROPERTY_INVALID_TYPE),
            ]
        );
        assert_eq!(result.issues[0].location, "/0/path");
    }

    #[test]
    fn test_command_names_are_case_insensitive() {
        let doc = run_ok(json!([{"command": "PUT", "path": "$.a", "value": 1}]), json!({}));
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn test_invalid_script_run_leaves_document() {
        let result = run(json!([{"command": "explode"}]), json!({"keep": true}));
        assert!(!result.success);
        assert_eq!(result.document, json!({"keep": true}));
        assert!(result.log_entries.iter().any(|e| e.level == LogLevel::Error));
    }

    // ========================================================================
    // Add / Put Tests
    // ========================================================================

    #[test]
    fn test_add_new_property() {
        let result = run(
            json!([{"command": "add", "path": "$.obj.newProp", "value": "x"}]),
            json!({"obj": {}}),
        );
        assert!(result.success);
        assert_eq!(result.document, json!({"obj": {"newProp": "x"}}));
    }

    #[test]
    fn test_add_creates_missing_parents() {
        let doc = run_ok(
            json!([{"command": "add", "path": "$.a.b.c", "value": 1}]),
            json!({}),
        );
        assert_eq!(doc, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_add_does_not_overwrite_non_object_parent() {
        let result = run(
            json!([{"command": "add", "path": "$.a.b.c", "value": 1}]),
            json!({"a": 5}),
        );
        assert!(result.success);
        assert_eq!(result.document, json!({"a": 5}));
        assert!(warnings(&result) >= 1);
    }

    #[test]
    fn test_add_to_every_wildcard_parent() {
        let doc = run_ok(
            json!([{"command": "add", "path": "$.items[*].seen", "value": true}]),
            json!({"items": [{"id": 1}, {"id": 2}]}),
        );
        assert_eq!(doc, json!({"items": [{"id": 1, "seen": true}, {"id": 2, "seen": true}]}));
    }

    #[test]
    fn test_add_value_relative_to_parent() {
        let doc = run_ok(
            json!([{"command": "add", "path": "$.items[*].label", "value": "#upper(@.name)"}]),
            json!({"items": [{"name": "a"}, {"name": "b"}]}),
        );
        assert_eq!(
            doc,
            json!({"items": [{"name": "a", "label": "A"}, {"name": "b", "label": "B"}]})
        );
    }

    #[test]
    fn test_put_overwrites_existing() {
        let doc = run_ok(
            json!([{"command": "put", "path": "$.a", "value": {"new": true}}]),
            json!({"a": 1}),
        );
        assert_eq!(doc, json!({"a": {"new": true}}));
    }

    #[test]
    fn test_add_root_fails_self_validation_and_continues() {
        let result = run(
            json!([
                {"command": "add", "path": "$", "value": 1},
                {"command": "put", "path": "$.after", "value": 2}
            ]),
            json!({}),
        );
        assert!(result.success);
        assert_eq!(result.document, json!({"after": 2}));
        assert!(result.log_entries.iter().any(|e| e.level == LogLevel::Error));
    }

    #[test]
    fn test_validate_reports_command_self_checks() {
        let engine = ScriptEngine::default();
        let script = json!([
            {"command": "put", "path": "$.before", "value": 1},
            {"command": "add", "path": "$", "value": 1}
        ])
        .to_string();

        let result = engine.validate(&script);
        assert!(!result.success());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].code, codes::PATH_INVALID);
        assert_eq!(result.issues[0].location, "/1/path");
        assert_eq!(result.issues[0].command_index, Some(1));

        let parsed = engine.parse(&script).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.validation().has_code(codes::PATH_INVALID));
    }

    #[test]
    fn test_stop_on_error_halts() {
        let engine = ScriptEngine::new(ScriptSettings {
            stop_on_error: true,
            ..ScriptSettings::default()
        });
        let script = json!([
            {"command": "add", "path": "$", "value": 1},
            {"command": "put", "path": "$.after", "value": 2}
        ]);
        let result = engine.run(&script.to_string(), json!({}));
        assert!(!result.success);
        assert_eq!(result.document, json!({}));
    }

    #[test]
    fn test_function_failure_skips_target() {
        let result = run(
            json!([{"command": "put", "path": "$.items[*].upper", "value": "#upper(@.name)"}]),
            json!({"items": [{"name": "ok"}, {"name": 3}]}),
        );
        assert!(result.success);
        assert_eq!(
            result.document,
            json!({"items": [{"name": "ok", "upper": "OK"}, {"name": 3}]})
        );
        assert_eq!(result.commands[0].skipped, 1);
    }

    // ========================================================================
    // Set / Remove / Rename Tests
    // ========================================================================

    #[test]
    fn test_set_replaces_matches_only() {
        let doc = run_ok(
            json!([{"command": "set", "path": "$.items[*].price", "value": "#concat(@, ' EUR')"}]),
            json!({"items": [{"price": 5}, {"name": "free"}]}),
        );
        assert_eq!(doc, json!({"items": [{"price": "5 EUR"}, {"name": "free"}]}));
    }

    #[test]
    fn test_zero_match_is_a_warning() {
        let result = run(
            json!([{"command": "set", "path": "$.missing", "value": 1}]),
            json!({"a": 1}),
        );
        assert!(result.success);
        assert_eq!(result.document, json!({"a": 1}));
        assert_eq!(warnings(&result), 1);
    }

    #[test]
    fn test_remove_filtered_items() {
        let doc = run_ok(
            json!([{"command": "remove", "path": "$.items[?(@.done == true)]"}]),
            json!({"items": [{"id": 1, "done": true}, {"id": 2, "done": false}, {"id": 3, "done": true}]}),
        );
        assert_eq!(doc, json!({"items": [{"id": 2, "done": false}]}));
    }

    #[test]
    fn test_remove_recursive() {
        let doc = run_ok(
            json!([{"command": "remove", "path": "$..secret"}]),
            json!({"secret": 1, "a": {"secret": 2, "b": [{"secret": 3, "keep": 4}]}}),
        );
        assert_eq!(doc, json!({"a": {"b": [{"keep": 4}]}}));
    }

    #[test]
    fn test_rename() {
        let doc = run_ok(
            json!([{"command": "rename", "path": "$.people[*].nm", "name": "name"}]),
            json!({"people": [{"nm": "a", "age": 1}, {"nm": "b"}]}),
        );
        assert_eq!(doc, json!({"people": [{"name": "a", "age": 1}, {"name": "b"}]}));
    }

    // ========================================================================
    // Copy / Move Tests
    // ========================================================================

    #[test]
    fn test_copy() {
        let doc = run_ok(
            json!([{"command": "copy", "fromPath": "$.a", "toPath": "$.b.c"}]),
            json!({"a": [1, 2]}),
        );
        assert_eq!(doc, json!({"a": [1, 2], "b": {"c": [1, 2]}}));
    }

    #[test]
    fn test_move() {
        let doc = run_ok(
            json!([{"command": "move", "fromPath": "$.draft.body", "toPath": "$.body"}]),
            json!({"draft": {"body": "text"}}),
        );
        assert_eq!(doc, json!({"draft": {}, "body": "text"}));
    }

    // ========================================================================
    // Merge / Distinct Tests
    // ========================================================================

    #[test]
    fn test_merge_objects() {
        let doc = run_ok(
            json!([{
                "command": "merge",
                "path": "$.config",
                "value": {"b": {"y": 2}, "list": [3], "gone": null},
                "settings": {"arrayHandling": "replace", "nullHandling": "ignore"}
            }]),
            json!({"config": {"a": 1, "b": {"x": 1}, "list": [1, 2], "gone": "still"}}),
        );
        assert_eq!(
            doc,
            json!({"config": {"a": 1, "b": {"x": 1, "y": 2}, "list": [3], "gone": "still"}})
        );
    }

    #[test]
    fn test_merge_kind_mismatch_skips() {
        let result = run(
            json!([{"command": "merge", "path": "$.a", "value": {"x": 1}}]),
            json!({"a": 5}),
        );
        assert_eq!(result.document, json!({"a": 5}));
        assert_eq!(result.commands[0].skipped, 1);
    }

    #[test]
    fn test_distinct_by_key() {
        let doc = run_ok(
            json!([{"command": "distinct", "path": "$.rows", "keyPaths": ["id", "@.kind"]}]),
            json!({"rows": [
                {"id": 1, "kind": "a", "n": 1},
                {"id": 1, "kind": "b"},
                {"id": 1, "kind": "a", "n": 2}
            ]}),
        );
        assert_eq!(doc, json!({"rows": [{"id": 1, "kind": "a", "n": 1}, {"id": 1, "kind": "b"}]}));
    }

    // ========================================================================
    // Execution Options Tests
    // ========================================================================

    #[test]
    fn test_memory_sink_receives_entries() {
        let engine = ScriptEngine::default();
        let sink = MemorySink::new();
        let result = engine.run_with(
            r#"[{"command": "put", "path": "$.a", "value": 1}]"#,
            json!({}),
            &sink,
        );
        assert!(result.success);
        assert_eq!(sink.entries(), result.log_entries);
        assert!(result.log_entries.iter().all(|e| !e.group.is_empty()));
    }

    #[test]
    fn test_script_runs_repeatedly() {
        let script = ScriptEngine::default()
            .parse(r#"[{"command": "add", "path": "$.n", "value": 1}]"#)
            .unwrap();
        assert_eq!(script.execute(json!({})).document, json!({"n": 1}));
        assert_eq!(script.execute(json!({"n": []})).document, json!({"n": [1]}));
    }

    #[test]
    fn test_custom_fetcher() {
        struct NothingFetcher;

        impl ItemFetcher for NothingFetcher {
            fn select_tokens(
                &self,
                _path: &Path,
                _document: &JsonValue,
                _current: &NodeLocation,
            ) -> Result<Vec<NodeLocation>, PathError> {
                Ok(Vec::new())
            }
        }

        let script = ScriptEngine::default()
            .parse(r#"[{"command": "set", "path": "$.a", "value": 2}]"#)
            .unwrap();
        let result = script.execute_with(
            json!({"a": 1}),
            &ExecutionOptions {
                fetcher: Some(&NothingFetcher),
                sink: None,
                stop_on_error: false,
            },
        );
        assert!(result.success);
        assert_eq!(result.document, json!({"a": 1}));
    }
}
