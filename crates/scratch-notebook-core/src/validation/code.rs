//! Code-dialect validation seam.
//!
//! Code cells are checked by an external syntax checker behind the
//! `SyntaxChecker` trait. When no checker is registered the cell stays valid
//! and gets a skip warning, mirroring the behavior of every other
//! unavailable analyzer.

use serde_json::Value;

use super::VALIDATION_SKIPPED;
use crate::types::{CellLanguage, Diagnostic, ScratchCell, ValidationResult};

/// Diagnostics produced by a syntax-checker backend. Fatal diagnostics map
/// to errors; style and lint findings map to warnings.
#[derive(Debug, Default)]
pub struct SyntaxReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

/// External syntax checker for code dialects.
pub trait SyntaxChecker: Send + Sync {
    fn check(&self, language: CellLanguage, content: &str) -> SyntaxReport;
}

pub fn validate(cell: &ScratchCell, checker: Option<&dyn SyntaxChecker>) -> ValidationResult {
    let mut result = ValidationResult::new(&cell.cell_id, cell.index, cell.language.clone());

    let Some(checker) = checker else {
        result.add_warning(
            Diagnostic::new("Syntax checker not available for this language")
                .with_code(VALIDATION_SKIPPED),
        );
        result
            .details
            .insert("reason".into(), Value::String("not validated".into()));
        return result;
    };

    let report = checker.check(cell.language.clone(), &cell.content);
    for error in report.errors {
        result.add_error(error);
    }
    for warning in report.warnings {
        result.add_warning(warning);
    }
    if result.errors.is_empty() {
        result.set_detail("syntax", "checked", Value::Bool(true));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    struct FixedChecker(SyntaxReport);

    impl SyntaxChecker for FixedChecker {
        fn check(&self, _language: CellLanguage, _content: &str) -> SyntaxReport {
            SyntaxReport {
                errors: self.0.errors.clone(),
                warnings: self.0.warnings.clone(),
            }
        }
    }

    fn cell() -> ScratchCell {
        ScratchCell {
            cell_id: "c".into(),
            index: 0,
            language: CellLanguage::Rs,
            content: "fn main() {}".into(),
            validate: true,
            json_schema: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn missing_checker_degrades_gracefully() {
        let result = validate(&cell(), None);
        assert!(result.valid);
        assert_eq!(result.details["reason"], "not validated");
    }

    #[test]
    fn fatal_diagnostics_become_errors() {
        let checker = FixedChecker(SyntaxReport {
            errors: vec![Diagnostic::new("unexpected token").at(2, 5)],
            warnings: vec![Diagnostic::new("line too long")],
        });
        let result = validate(&cell(), Some(&checker));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn clean_report_marks_checked() {
        let checker = FixedChecker(SyntaxReport::default());
        let result = validate(&cell(), Some(&checker));
        assert!(result.valid);
        assert_eq!(result.details["syntax"]["checked"], true);
    }
}
