//! Schema coercion and `scratchpad://` reference resolution.
//!
//! A cell's `json_schema` may be an inline object, a JSON string, or a
//! `scratchpad://schemas/<name>` reference into the pad's shared registry.
//! References may also appear as `$ref` values nested inside an inline
//! schema; known references are inlined before compilation. Unresolved
//! references degrade to a warning and the schema check is skipped.

use serde_json::Value;

use super::{ValidationContext, UNRESOLVED_SCHEMA_REF};
use crate::types::{Diagnostic, ValidationResult};

pub const SCHEMA_REF_PREFIX: &str = "scratchpad://schemas/";

/// Nesting bound for reference inlining; registries are flat in practice and
/// this guards against `$ref` cycles.
const MAX_REF_DEPTH: usize = 8;

/// Coerce a raw `json_schema` value into a compilable schema.
///
/// Returns `None` when no schema check should run: either the input was
/// malformed (error recorded) or a reference did not resolve (warning
/// recorded).
pub fn coerce_schema(
    raw: &Value,
    ctx: &ValidationContext,
    result: &mut ValidationResult,
) -> Option<Value> {
    let candidate = match raw {
        Value::Object(_) => raw.clone(),
        Value::String(text) => {
            if let Some(name) = text.strip_prefix(SCHEMA_REF_PREFIX) {
                serde_json::json!({ "$ref": format!("{SCHEMA_REF_PREFIX}{name}") })
            } else {
                match serde_json::from_str::<Value>(text) {
                    Ok(parsed @ Value::Object(_)) => parsed,
                    Ok(_) => {
                        result.add_error(Diagnostic::new(
                            "JSON schema string must decode to an object",
                        ));
                        return None;
                    }
                    Err(err) => {
                        result.add_error(
                            Diagnostic::new(format!("Invalid JSON schema string: {err}"))
                                .at(err.line() as u64, err.column() as u64),
                        );
                        return None;
                    }
                }
            }
        }
        _ => {
            result.add_error(Diagnostic::new("JSON schema must be an object or JSON string"));
            return None;
        }
    };

    match inline_refs(&candidate, ctx, 0) {
        Ok(resolved) => Some(resolved),
        Err(missing) => {
            result.add_warning(
                Diagnostic::new(format!(
                    "JSON schema reference '{missing}' not found in scratchpad metadata"
                ))
                .with_code(UNRESOLVED_SCHEMA_REF)
                .with_details(serde_json::json!({ "ref": missing })),
            );
            result.set_detail("schema", "unresolved_ref", Value::String(missing));
            None
        }
    }
}

/// Replace `{"$ref": "scratchpad://schemas/<name>"}` nodes with the
/// registered schema. Errors with the missing name when a reference has no
/// registry entry.
fn inline_refs(value: &Value, ctx: &ValidationContext, depth: usize) -> Result<Value, String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if let Some(name) = reference.strip_prefix(SCHEMA_REF_PREFIX) {
                    let target = ctx.schema(name).ok_or_else(|| name.to_string())?;
                    if depth >= MAX_REF_DEPTH {
                        return Ok(target.clone());
                    }
                    return inline_refs(target, ctx, depth + 1);
                }
            }
            let mut resolved = serde_json::Map::new();
            for (key, entry) in map {
                resolved.insert(key.clone(), inline_refs(entry, ctx, depth)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| inline_refs(item, ctx, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Validate an instance against a coerced schema, recording diagnostics.
pub fn apply_schema(instance: &Value, schema: &Value, result: &mut ValidationResult) {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(err) => {
            result.add_error(Diagnostic::new(format!("Invalid JSON schema: {err}")));
            return;
        }
    };

    let mut any = false;
    for error in validator.iter_errors(instance) {
        any = true;
        result.add_error(
            Diagnostic::new(format!("JSON schema validation failed: {error}")).with_details(
                serde_json::json!({ "path": error.instance_path.to_string() }),
            ),
        );
    }
    if !any {
        result.set_detail("schema", "applied", Value::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellLanguage, SchemaEntry, ValidationResult};
    use crate::validation::ValidationContext;
    use serde_json::json;

    fn ctx_with(name: &str, schema: Value) -> ValidationContext {
        let Value::Object(map) = schema else { panic!() };
        ValidationContext::from_registry(&[SchemaEntry {
            id: "id".into(),
            name: name.into(),
            description: String::new(),
            schema: map,
        }])
    }

    fn fresh_result() -> ValidationResult {
        ValidationResult::new("c", 0, CellLanguage::Json)
    }

    #[test]
    fn string_reference_resolves_against_registry() {
        let ctx = ctx_with("point", json!({"type": "object"}));
        let mut result = fresh_result();
        let raw = Value::String(format!("{SCHEMA_REF_PREFIX}point"));
        let schema = coerce_schema(&raw, &ctx, &mut result).unwrap();
        assert_eq!(schema["type"], "object");
        assert!(result.valid);
    }

    #[test]
    fn missing_reference_is_a_warning_not_an_error() {
        let ctx = ValidationContext::default();
        let mut result = fresh_result();
        let raw = json!({"$ref": format!("{SCHEMA_REF_PREFIX}missing")});
        assert!(coerce_schema(&raw, &ctx, &mut result).is_none());
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code.as_deref(), Some(UNRESOLVED_SCHEMA_REF));
        assert_eq!(result.details["schema"]["unresolved_ref"], "missing");
    }

    #[test]
    fn nested_references_are_inlined() {
        let ctx = ctx_with("inner", json!({"type": "integer"}));
        let mut result = fresh_result();
        let raw = json!({
            "type": "object",
            "properties": {"n": {"$ref": format!("{SCHEMA_REF_PREFIX}inner")}}
        });
        let schema = coerce_schema(&raw, &ctx, &mut result).unwrap();
        assert_eq!(schema["properties"]["n"]["type"], "integer");
    }

    #[test]
    fn malformed_schema_string_is_an_error() {
        let mut result = fresh_result();
        let raw = Value::String("{not json".into());
        assert!(coerce_schema(&raw, &ValidationContext::default(), &mut result).is_none());
        assert!(!result.valid);
    }

    #[test]
    fn apply_schema_reports_mismatches_with_paths() {
        let mut result = fresh_result();
        let schema = json!({"type": "object", "properties": {"x": {"type": "integer"}}});
        apply_schema(&json!({"x": "nope"}), &schema, &mut result);
        assert!(!result.valid);
        assert!(result.errors[0].message.contains("schema validation failed"));
    }

    #[test]
    fn apply_schema_marks_success() {
        let mut result = fresh_result();
        apply_schema(&json!({"x": 1}), &json!({"type": "object"}), &mut result);
        assert!(result.valid);
        assert_eq!(result.details["schema"]["applied"], true);
    }
}
