//! Validation result types.
//!
//! Diagnostics are advisory: errors flip `valid` to false but never reject a
//! write; warnings never affect `valid` at all.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::language::CellLanguage;

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            line: None,
            column: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn at(mut self, line: u64, column: u64) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Result of validating a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub cell_id: String,
    pub index: usize,
    pub language: CellLanguage,
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl ValidationResult {
    pub fn new(cell_id: impl Into<String>, index: usize, language: CellLanguage) -> Self {
        Self {
            cell_id: cell_id.into(),
            index,
            language,
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            details: Map::new(),
        }
    }

    pub fn add_error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
        self.valid = false;
    }

    pub fn add_warning(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }

    /// Set a key under a named `details` section (`syntax`, `schema`,
    /// `analysis`).
    pub fn set_detail(&mut self, section: &str, key: &str, value: Value) {
        let entry = self
            .details
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_flip_valid_warnings_do_not() {
        let mut result = ValidationResult::new("c", 0, CellLanguage::Json);
        result.add_warning(Diagnostic::new("heads up"));
        assert!(result.valid);
        result.add_error(Diagnostic::new("broken"));
        assert!(!result.valid);
    }

    #[test]
    fn details_sections_accumulate() {
        let mut result = ValidationResult::new("c", 0, CellLanguage::Json);
        result.set_detail("schema", "applied", Value::Bool(true));
        result.set_detail("schema", "unresolved_ref", Value::String("x".into()));
        assert_eq!(result.details["schema"]["applied"], true);
        assert_eq!(result.details["schema"]["unresolved_ref"], "x");
    }

    #[test]
    fn diagnostic_serialization_skips_empty_fields() {
        let value = serde_json::to_value(Diagnostic::new("m")).unwrap();
        assert!(value.get("code").is_none());
        assert!(value.get("line").is_none());
        let positioned = serde_json::to_value(Diagnostic::new("m").at(3, 7)).unwrap();
        assert_eq!(positioned["line"], 3);
        assert_eq!(positioned["column"], 7);
    }
}
