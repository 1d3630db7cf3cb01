//! Tag normalization helpers.
//!
//! Tags arrive as JSON arrays, single strings, or are absent. Normalization
//! trims whitespace, drops empties, and deduplicates preserving first
//! occurrence so listings stay stable across reads.

use serde_json::Value;

/// Normalize a slice of raw tag strings.
pub fn normalize_tags<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for value in values {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            ordered.push(trimmed.to_string());
        }
    }
    ordered
}

/// Extract a tag list from an arbitrary JSON value (string, array, or null).
pub fn tags_from_value(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => normalize_tags([s.as_str()]),
        Some(Value::Array(items)) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            normalize_tags(strings)
        }
        Some(other) => normalize_tags([other.to_string()]),
    }
}

/// Merge tag sets, deduplicating while preserving first-seen order.
pub fn merge_tags<'a, I>(sets: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for set in sets {
        for tag in set {
            if seen.insert(tag.clone()) {
                merged.push(tag.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trims_and_dedupes_preserving_order() {
        let tags = normalize_tags(["  deploy ", "release", "deploy", "", "release"]);
        assert_eq!(tags, vec!["deploy", "release"]);
    }

    #[test]
    fn single_string_becomes_one_tag() {
        let value = json!("incident");
        assert_eq!(tags_from_value(Some(&value)), vec!["incident"]);
    }

    #[test]
    fn array_with_nulls_and_numbers() {
        let value = json!(["a", null, 7, " b "]);
        assert_eq!(tags_from_value(Some(&value)), vec!["a", "7", "b"]);
    }

    #[test]
    fn absent_value_is_empty() {
        assert!(tags_from_value(None).is_empty());
        assert!(tags_from_value(Some(&Value::Null)).is_empty());
    }

    #[test]
    fn merge_keeps_first_occurrence() {
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["y".to_string(), "z".to_string()];
        assert_eq!(merge_tags([a.as_slice(), b.as_slice()]), vec!["x", "y", "z"]);
    }
}
