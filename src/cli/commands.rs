//! Listing of the registered commands and functions

use std::fmt::Write;

use crate::script::ScriptEngine;

const COMMAND_SUMMARIES: &[(&str, &str)] = &[
    ("add", "path, value          Add a property, or append to an existing array"),
    ("put", "path, value          Add or overwrite a property"),
    ("set", "path, value          Replace every existing match (@ is the match)"),
    ("remove", "path                 Remove every match"),
    ("rename", "path, name           Rename matched properties in place"),
    ("copy", "fromPath, toPath     Copy matched node(s) to a new location"),
    ("move", "fromPath, toPath     Move matched node(s) to a new location"),
    ("merge", "path, value          Deep-merge a value into every match"),
    ("distinct", "path, keyPaths?      Drop duplicate array elements"),
    ("compare", "leftPath, rightPath, resultPath   Diff two sub-trees"),
];

/// Get the command and function listing
pub fn get_command_listing(engine: &ScriptEngine) -> String {
    let mut out = String::from("COMMANDS\n\n");
    for name in engine.commands().names() {
        let summary = COMMAND_SUMMARIES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, summary)| *summary)
            .unwrap_or("");
        let _ = writeln!(out, "  {:<10} {}", name, summary);
    }

    out.push_str("\nFUNCTIONS\n\n");
    for name in engine.functions().names() {
        let _ = writeln!(out, "  #{}", name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_has_builtins() {
        let listing = get_command_listing(&ScriptEngine::default());
        assert!(listing.contains("  compare"));
        assert!(listing.contains("  #concat"));
    }
}
