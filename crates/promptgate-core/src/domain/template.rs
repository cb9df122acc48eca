//! Placeholder rendering for instruction templates.
//!
//! Bodies carry `{{key}}` placeholders. Rendering merges the template's
//! default parameters under the call-time parameters (call-time wins) and
//! substitutes every occurrence in a single pass. Keys with no value are left
//! as literal placeholder text.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

/// Parameter map passed to [`render`].
pub type Params = BTreeMap<String, Value>;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern is valid"))
}

/// Result of rendering a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    /// Placeholder keys that had no value, in order of first appearance.
    pub unresolved: Vec<String>,
}

/// Merge `defaults` with `params`; entries in `params` win.
pub fn merge_params(defaults: &Params, params: &Params) -> Params {
    let mut merged = defaults.clone();
    for (key, value) in params {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Textual form of a parameter value.
///
/// Strings are inserted verbatim, arrays are joined with `", "`, `null`
/// renders empty, and numbers, booleans and objects use their JSON text.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(stringify_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
    }
}

/// Substitute `{{key}}` occurrences in `body` from `params`.
pub fn render_body(body: &str, params: &Params) -> Rendered {
    let mut unresolved = Vec::new();
    let text = placeholder_pattern()
        .replace_all(body, |caps: &Captures<'_>| match params.get(&caps[1]) {
            Some(value) => stringify_value(value),
            None => {
                let key = caps[1].to_string();
                if !unresolved.contains(&key) {
                    unresolved.push(key);
                }
                caps[0].to_string()
            }
        })
        .into_owned();
    Rendered { text, unresolved }
}

/// Distinct placeholder keys in `body`, in order of first appearance.
pub fn placeholders(body: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in placeholder_pattern().captures_iter(body) {
        let key = &caps[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn renders_known_key() {
        let out = render_body("Hello {{a}}", &params(&[("a", json!("x"))]));
        assert_eq!(out.text, "Hello x");
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn leaves_unknown_key_literal() {
        let out = render_body("Hi {{b}}", &Params::new());
        assert_eq!(out.text, "Hi {{b}}");
        assert_eq!(out.unresolved, vec!["b".to_string()]);
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = render_body("{{a}}-{{a}}-{{a}}", &params(&[("a", json!("z"))]));
        assert_eq!(out.text, "z-z-z");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = render_body(
            "{{a}} {{b}}",
            &params(&[("a", json!("{{b}}")), ("b", json!("B"))]),
        );
        assert_eq!(out.text, "{{b}} B");
    }

    #[test]
    fn stringifies_non_string_values() {
        assert_eq!(stringify_value(&json!(7)), "7");
        assert_eq!(stringify_value(&json!(2.5)), "2.5");
        assert_eq!(stringify_value(&json!(true)), "true");
        assert_eq!(stringify_value(&json!(null)), "");
        assert_eq!(stringify_value(&json!(["Rust", "SQL"])), "Rust, SQL");
        assert_eq!(stringify_value(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn call_time_params_win_over_defaults() {
        let defaults = params(&[("tone", json!("formal")), ("lang", json!("en"))]);
        let call = params(&[("tone", json!("casual"))]);
        let merged = merge_params(&defaults, &call);
        assert_eq!(merged["tone"], json!("casual"));
        assert_eq!(merged["lang"], json!("en"));
    }

    #[test]
    fn lists_distinct_placeholders_in_order() {
        let keys = placeholders("{{title}} {{skills}} {{title}} {{description}}");
        assert_eq!(keys, vec!["title", "skills", "description"]);
        assert!(placeholders("no placeholders here").is_empty());
    }
}
