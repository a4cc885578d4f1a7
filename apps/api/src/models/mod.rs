//! Domain models and the lookup helpers shared by every normalization boundary.
//!
//! Upstream payloads are duck-typed: the same field may arrive under several
//! names, as a string or a number, or nested one level down. The helpers here
//! take an ordered list of candidate keys (dotted for nesting) and return the
//! first usable value.

use serde_json::Value;

pub mod application;
pub mod job;
pub mod prep_plan;
pub mod video_plan;

/// Returns the first non-null value found under any of `keys`.
/// A key containing `.` is treated as a nested path (`data.analysis`).
pub fn first_value<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| {
            if key.contains('.') {
                value.pointer(&format!("/{}", key.replace('.', "/")))
            } else {
                value.get(*key)
            }
        })
        .find(|v| !v.is_null())
}

/// First non-empty string under `keys`. Numbers are rendered as strings.
pub fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        first_value(value, &[key]).and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    })
}

/// First number under `keys`. Numeric strings (`"82"`, `"82%"`) are accepted.
pub fn first_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| {
        first_value(value, &[key]).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            _ => None,
        })
    })
}

/// Ids arrive as strings or numbers depending on the backend.
pub fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First id under `keys`.
pub fn first_id(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| first_value(value, &[key]).and_then(value_as_id))
}

/// Flattens a list that may hold plain strings or objects such as
/// `{ "skill": "Rust" }` / `{ "name": "Rust" }`. A single comma-separated
/// string is split.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(_) => first_str(item, &["skill", "name", "title", "text"]),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split([',', '\n', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// `string_list` over the first key that yields a non-empty list.
pub fn first_list(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .map(|key| first_value(value, &[key]).map(string_list).unwrap_or_default())
        .find(|list| !list.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_first_value_follows_dotted_paths() {
        let v = json!({ "data": { "analysis": { "score": 7 } } });
        assert_eq!(first_value(&v, &["analysis", "data.analysis.score"]), Some(&json!(7)));
    }

    #[test]
    fn test_first_str_skips_empty_and_null() {
        let v = json!({ "companyName": "", "company_name": null, "company": "Acme" });
        assert_eq!(
            first_str(&v, &["companyName", "company_name", "company"]),
            Some("Acme".to_string())
        );
    }

    #[test]
    fn test_first_f64_accepts_numeric_strings() {
        let v = json!({ "score": "82%" });
        assert_eq!(first_f64(&v, &["overall_score", "score"]), Some(82.0));
    }

    #[test]
    fn test_string_list_mixed_shapes() {
        let v = json!(["Rust", { "skill": "Kubernetes" }, { "name": "GraphQL" }, 3, ""]);
        assert_eq!(string_list(&v), vec!["Rust", "Kubernetes", "GraphQL"]);
        assert_eq!(string_list(&json!("a, b;c")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_first_list_skips_empty_lists() {
        let v = json!({ "requirements": [], "skills": ["sql"] });
        assert_eq!(first_list(&v, &["requirements", "skills", "tags"]), vec!["sql"]);
    }

    #[test]
    fn test_value_as_id_accepts_numbers() {
        assert_eq!(value_as_id(&json!(42)), Some("42".to_string()));
        assert_eq!(value_as_id(&json!("abc")), Some("abc".to_string()));
        assert_eq!(value_as_id(&json!("")), None);
        assert_eq!(value_as_id(&json!(null)), None);
    }
}
