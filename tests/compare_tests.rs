#[cfg(test)]
mod tests {
    use clove_script::compare::{CompareArraySettings, DifferenceSubType, compare};
    use clove_script::*;
    use serde_json::{Value as JsonValue, json};

    fn diff(left: JsonValue, right: JsonValue, settings: &CompareSettings) -> CompareResults {
        compare(&left, &right, settings, &JsonPathFetcher).unwrap()
    }

    fn keyed(array_path: &str, key_paths: &[&str], unique: bool) -> CompareSettings {
        CompareSettings {
            array_settings: vec![CompareArraySettings {
                array_path: array_path.to_string(),
                key_paths: key_paths.iter().map(|k| k.to_string()).collect(),
                unique_index_matching: unique,
            }],
            ..CompareSettings::default()
        }
    }

    fn types(results: &CompareResults) -> Vec<DifferenceType> {
        results.differences().map(|r| r.difference_type).collect()
    }

    // ========================================================================
    // Leaf & Object Tests
    // ========================================================================

    #[test]
    fn test_changed_value() {
        let results = diff(json!({"a": 1}), json!({"a": 2}), &CompareSettings::default());
        let differences: Vec<_> = results.differences().collect();
        assert_eq!(differences.len(), 1);
        assert!(differences[0].is_difference);
        assert_eq!(differences[0].difference_type, DifferenceType::Changed);
        assert_eq!(differences[0].left_path.as_deref(), Some("$.a"));
        assert_eq!(differences[0].left_value, Some(json!(1)));
        assert_eq!(differences[0].right_value, Some(json!(2)));
    }

    #[test]
    fn test_identical_documents_have_no_differences() {
        let doc = json!({"a": 1, "b": [1, {"c": null}], "d": {"e": "x"}});
        let results = diff(doc.clone(), doc, &CompareSettings::default());
        assert!(!results.has_differences());
        assert!(results.results.iter().all(|r| r.difference_type == DifferenceType::Equal));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let results = diff(json!({"n": 1}), json!({"n": 1.0}), &CompareSettings::default());
        assert!(!results.has_differences());
    }

    #[test]
    fn test_added_and_removed_properties() {
        let results = diff(json!({"a": 1, "gone": true}), json!({"a": 1, "new": 2}), &CompareSettings::default());
        assert_eq!(types(&results), vec![DifferenceType::Removed, DifferenceType::Added]);
        assert!(
            results
                .differences()
                .all(|r| r.difference_sub_type == DifferenceSubType::Property)
        );
    }

    #[test]
    fn test_type_changed() {
        let results = diff(json!({"a": "1"}), json!({"a": 1}), &CompareSettings::default());
        assert_eq!(types(&results), vec![DifferenceType::TypeChanged]);

        let results = diff(json!({"a": {"x": 1}}), json!({"a": [1]}), &CompareSettings::default());
        assert_eq!(types(&results), vec![DifferenceType::TypeChanged]);
    }

    #[test]
    fn test_result_type_filter() {
        let settings = CompareSettings {
            result_types: vec![DifferenceType::Added],
            ..CompareSettings::default()
        };
        let results = diff(json!({"a": 1, "b": 1}), json!({"a": 2, "c": 1}), &settings);
        assert_eq!(results.len(), 1);
        assert_eq!(results.results[0].right_path.as_deref(), Some("$.c"));
    }

    // ========================================================================
    // Array Tests
    // ========================================================================

    #[test]
    fn test_positional_arrays() {
        let results = diff(json!([1, 2, 3]), json!([1, 5]), &CompareSettings::default());
        assert_eq!(types(&results), vec![DifferenceType::Changed, DifferenceType::Removed]);
    }

    #[test]
    fn test_reordered_array_without_keys_differs() {
        let results = diff(
            json!({"items": [{"id": 1}, {"id": 2}]}),
            json!({"items": [{"id": 2}, {"id": 1}]}),
            &CompareSettings::default(),
        );
        assert!(results.has_differences());
    }

    #[test]
    fn test_keyed_reorder_has_no_differences() {
        let results = diff(
            json!({"items": [{"id": 1, "v": "a"}, {"id": 2, "v": "b"}]}),
            json!({"items": [{"id": 2, "v": "b"}, {"id": 1, "v": "a"}]}),
            &keyed("$.items", &["id"], false),
        );
        assert!(!results.has_differences());
    }

    #[test]
    fn test_keyed_change_records_filter() {
        let results = diff(
            json!({"items": [{"id": 1, "v": "a"}, {"id": 3, "v": "c"}]}),
            json!({"items": [{"id": 3, "v": "z"}, {"id": 1, "v": "a"}]}),
            &keyed("$.items", &["id"], false),
        );
        let differences: Vec<_> = results.differences().collect();
        assert_eq!(differences.len(), 1);
        assert_eq!(differences[0].difference_type, DifferenceType::Changed);
        assert_eq!(differences[0].left_path.as_deref(), Some("$.items[1].v"));
        assert_eq!(differences[0].right_path.as_deref(), Some("$.items[0].v"));
        assert_eq!(differences[0].array_filter.as_deref(), Some("[?(@.id == 3)]"));
    }

    #[test]
    fn test_keyed_numeric_keys_pair_by_value() {
        let results = diff(
            json!({"items": [{"id": 1, "v": "a"}, {"id": 2.50, "v": "b"}]}),
            json!({"items": [{"id": 2.5, "v": "b"}, {"id": 1.0, "v": "a"}]}),
            &keyed("$.items", &["id"], false),
        );
        assert!(!results.has_differences());
    }

    #[test]
    fn test_keyed_property_changes_record_filter() {
        let results = diff(
            json!({"items": [{"id": 3, "old": true}]}),
            json!({"items": [{"id": 3, "new": true}]}),
            &keyed("$.items", &["id"], false),
        );
        assert_eq!(types(&results), vec![DifferenceType::Removed, DifferenceType::Added]);
        assert!(
            results
                .differences()
                .all(|r| r.array_filter.as_deref() == Some("[?(@.id == 3)]"))
        );
    }

    #[test]
    fn test_keyed_added_and_removed() {
        let results = diff(
            json!({"items": [{"id": 1}, {"id": 2}]}),
            json!({"items": [{"id": 2}, {"id": 3}]}),
            &keyed("$.items", &["id"], false),
        );
        assert_eq!(types(&results), vec![DifferenceType::Removed, DifferenceType::Added]);
        assert!(
            results
                .differences()
                .all(|r| r.difference_sub_type == DifferenceSubType::ArrayItem)
        );
    }

    #[test]
    fn test_keyed_nested_wildcard_path() {
        let left = json!({"orders": [{"lines": [{"sku": "a", "q": 1}, {"sku": "b", "q": 2}]}]});
        let right = json!({"orders": [{"lines": [{"sku": "b", "q": 2}, {"sku": "a", "q": 1}]}]});
        assert!(!diff(left.clone(), right.clone(), &keyed("$.orders[*].lines", &["sku"], false)).has_differences());
        assert!(!diff(left, right, &keyed("$..lines", &["@.sku"], false)).has_differences());
    }

    #[test]
    fn test_unique_matching_reports_duplicates() {
        let results = diff(
            json!({"items": [{"id": 1}, {"id": 1}]}),
            json!({"items": [{"id": 1}]}),
            &keyed("$.items", &["id"], true),
        );
        assert_eq!(types(&results), vec![DifferenceType::Duplicate]);
        assert_eq!(results.warnings.len(), 1);
    }

    // ========================================================================
    // Compare Command Tests
    // ========================================================================

    #[test]
    fn test_compare_command_writes_results() {
        let script = json!([{
            "command": "compare",
            "leftPath": "$.before",
            "rightPath": "$.after",
            "resultPath": "$.report.diff",
            "settings": {"resultTypes": ["Changed"]}
        }]);
        let result = ScriptEngine::default().run(
            &script.to_string(),
            json!({"before": {"a": 1, "b": 2}, "after": {"a": 1, "b": 3}}),
        );
        assert!(result.success);
        assert_eq!(
            result.document["report"]["diff"],
            json!([{
                "isDifference": true,
                "differenceType": "Changed",
                "differenceSubType": "Value",
                "leftPath": "$.before.b",
                "rightPath": "$.after.b",
                "leftValue": 2,
                "rightValue": 3
            }])
        );
    }

    #[test]
    fn test_compare_command_invalid_settings() {
        let script = json!([{
            "command": "compare",
            "leftPath": "$.a",
            "rightPath": "$.b",
            "resultPath": "$.c",
            "settings": {"arraySettings": [{"arrayPath": "$.x[", "keyPaths": ["id"]}]}
        }]);
        let validation = ScriptEngine::default().validate(&script.to_string());
        assert!(validation.has_code("Settings.Invalid"));
    }
}
