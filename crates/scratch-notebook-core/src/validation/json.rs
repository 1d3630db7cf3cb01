//! JSON cell validation.

use serde_json::Value;

use super::schema_ref::{apply_schema, coerce_schema};
use super::ValidationContext;
use crate::types::{Diagnostic, ScratchCell, ValidationResult};

pub fn validate(cell: &ScratchCell, ctx: &ValidationContext) -> ValidationResult {
    let mut result = ValidationResult::new(&cell.cell_id, cell.index, cell.language.clone());

    let parsed: Value = match serde_json::from_str(&cell.content) {
        Ok(parsed) => parsed,
        Err(err) => {
            result.add_error(
                Diagnostic::new(format!("Invalid JSON: {err}"))
                    .at(err.line() as u64, err.column() as u64),
            );
            result.set_detail(
                "syntax",
                "line",
                Value::Number((err.line() as u64).into()),
            );
            return result;
        }
    };

    if let Some(raw_schema) = &cell.json_schema {
        if let Some(schema) = coerce_schema(raw_schema, ctx, &mut result) {
            apply_schema(&parsed, &schema, &mut result);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellLanguage;
    use serde_json::{json, Map};

    fn cell(content: &str, schema: Option<Value>) -> ScratchCell {
        ScratchCell {
            cell_id: "c".into(),
            index: 0,
            language: CellLanguage::Json,
            content: content.into(),
            validate: true,
            json_schema: schema,
            metadata: Map::new(),
        }
    }

    #[test]
    fn well_formed_json_is_valid() {
        let result = validate(&cell("{\"x\": 1}", None), &ValidationContext::default());
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn parse_failure_reports_position() {
        let result = validate(&cell("{\"x\": }", None), &ValidationContext::default());
        assert!(!result.valid);
        assert!(result.errors[0].line.is_some());
        assert!(result.errors[0].message.starts_with("Invalid JSON"));
    }

    #[test]
    fn inline_schema_mismatch_is_an_error() {
        let schema = json!({"type": "object", "required": ["y"]});
        let result = validate(&cell("{\"x\": 1}", Some(schema)), &ValidationContext::default());
        assert!(!result.valid);
    }

    #[test]
    fn inline_schema_match_records_applied() {
        let schema = json!({"type": "object"});
        let result = validate(&cell("{\"x\": 1}", Some(schema)), &ValidationContext::default());
        assert!(result.valid);
        assert_eq!(result.details["schema"]["applied"], true);
    }

    #[test]
    fn schema_as_json_string_is_parsed() {
        let schema = Value::String("{\"type\": \"array\"}".into());
        let result = validate(&cell("[1, 2]", Some(schema)), &ValidationContext::default());
        assert!(result.valid);
    }
}
