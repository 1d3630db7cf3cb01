//! YAML cell validation.
//!
//! Documents are safe-loaded straight into JSON values, so YAML constructs
//! with no JSON counterpart (custom tags, non-string keys) surface as parse
//! errors rather than panics.

use serde_json::Value;

use super::schema_ref::{apply_schema, coerce_schema};
use super::ValidationContext;
use crate::types::{Diagnostic, ScratchCell, ValidationResult};

pub fn validate(cell: &ScratchCell, ctx: &ValidationContext) -> ValidationResult {
    let mut result = ValidationResult::new(&cell.cell_id, cell.index, cell.language.clone());

    let parsed: Value = match serde_yaml::from_str(&cell.content) {
        Ok(parsed) => parsed,
        Err(err) => {
            let mut diagnostic = Diagnostic::new(format!("Invalid YAML: {err}"));
            if let Some(location) = err.location() {
                diagnostic = diagnostic.at(location.line() as u64, location.column() as u64);
            }
            result.add_error(diagnostic);
            return result;
        }
    };

    if parsed.is_null() {
        return result;
    }

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
            language: CellLanguage::Yaml,
            content: content.into(),
            validate: true,
            json_schema: schema,
            metadata: Map::new(),
        }
    }

    #[test]
    fn well_formed_yaml_is_valid() {
        let result = validate(&cell("key: value\nitems:\n  - 1\n  - 2\n", None), &ValidationContext::default());
        assert!(result.valid);
    }

    #[test]
    fn tab_indentation_is_an_error() {
        let result = validate(&cell("key:\n\t- broken", None), &ValidationContext::default());
        assert!(!result.valid);
        assert!(result.errors[0].message.starts_with("Invalid YAML"));
    }

    #[test]
    fn empty_document_skips_schema_check() {
        let schema = json!({"type": "object", "required": ["x"]});
        let result = validate(&cell("", Some(schema)), &ValidationContext::default());
        assert!(result.valid);
    }

    #[test]
    fn loaded_object_is_schema_checked() {
        let schema = json!({"type": "object", "required": ["name"]});
        let ok = validate(&cell("name: pad\n", Some(schema.clone())), &ValidationContext::default());
        assert!(ok.valid);
        let bad = validate(&cell("other: 1\n", Some(schema)), &ValidationContext::default());
        assert!(!bad.valid);
    }
}
