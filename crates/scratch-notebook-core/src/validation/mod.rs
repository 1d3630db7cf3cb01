//! Advisory validation pipeline.
//!
//! `validate_cell` dispatches on the cell language and never rejects a
//! write: errors and warnings land in the `ValidationResult` attached to the
//! successful response. The only failure mode surfaced as a request error is
//! the batch deadline (`VALIDATION_TIMEOUT`), enforced per request across
//! all cells.
//!
//! CPU-bound work runs on the blocking pool so the dispatch path keeps
//! making progress on other requests.

mod code;
mod json;
mod markdown;
mod schema_ref;
mod yaml;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{ScratchError, ScratchResult};
use crate::types::{CellLanguage, Diagnostic, ScratchCell, SchemaEntry, ValidationResult};

pub use code::{SyntaxChecker, SyntaxReport};
pub use schema_ref::SCHEMA_REF_PREFIX;

/// Warning code attached when a validator backend is unavailable or a
/// language carries no validation semantics.
pub const VALIDATION_SKIPPED: &str = "VALIDATION_SKIPPED";

/// Warning code for `scratchpad://schemas/<name>` references that do not
/// resolve against the pad's registry.
pub const UNRESOLVED_SCHEMA_REF: &str = "UNRESOLVED_SCHEMA_REF";

/// Everything a validation pass needs: the pad's schema registry and the
/// optional syntax-checker backend for code dialects.
#[derive(Default)]
pub struct ValidationContext {
    schemas: HashMap<String, Value>,
    syntax_checker: Option<Arc<dyn SyntaxChecker>>,
}

impl ValidationContext {
    pub fn from_registry(entries: &[SchemaEntry]) -> Self {
        let schemas = entries
            .iter()
            .map(|entry| {
                (
                    entry.name.clone(),
                    Value::Object(entry.schema.clone()),
                )
            })
            .collect();
        Self {
            schemas,
            syntax_checker: None,
        }
    }

    pub fn with_syntax_checker(mut self, checker: Arc<dyn SyntaxChecker>) -> Self {
        self.syntax_checker = Some(checker);
        self
    }

    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }
}

/// Validate a single cell synchronously.
pub fn validate_cell(cell: &ScratchCell, ctx: &ValidationContext) -> ValidationResult {
    match cell.language {
        CellLanguage::Json => json::validate(cell, ctx),
        CellLanguage::Yaml | CellLanguage::Yml => yaml::validate(cell, ctx),
        CellLanguage::Md => markdown::validate(cell),
        CellLanguage::Txt => validate_plain_text(cell),
        CellLanguage::Other(_) => validate_unknown(cell),
        _ => code::validate(cell, ctx.syntax_checker.as_deref()),
    }
}

/// Validate a batch of cells under a single request deadline.
///
/// Returns `VALIDATION_TIMEOUT` with no partial results when the deadline
/// expires; the blocking task is left to finish and its output discarded.
pub async fn validate_cells(
    cells: Vec<ScratchCell>,
    ctx: Arc<ValidationContext>,
    timeout: Option<Duration>,
) -> ScratchResult<Vec<ValidationResult>> {
    let task = tokio::task::spawn_blocking(move || {
        cells
            .iter()
            .map(|cell| validate_cell(cell, &ctx))
            .collect::<Vec<_>>()
    });

    let outcome = match timeout.filter(|t| !t.is_zero()) {
        Some(deadline) => match tokio::time::timeout(deadline, task).await {
            Ok(joined) => joined,
            Err(_) => return Err(ScratchError::timeout("Validation timed out")),
        },
        None => task.await,
    };

    outcome.map_err(|_| ScratchError::internal("Validation worker failed"))
}

fn validate_plain_text(cell: &ScratchCell) -> ValidationResult {
    let mut result = ValidationResult::new(&cell.cell_id, cell.index, cell.language.clone());
    result.add_warning(Diagnostic::new("Validation not performed").with_code(VALIDATION_SKIPPED));
    result
        .details
        .insert("reason".into(), Value::String("no validation performed".into()));
    result
}

/// Languages outside the known set are stored untouched and never fail: the
/// result is valid with a skip warning.
fn validate_unknown(cell: &ScratchCell) -> ValidationResult {
    let mut result = ValidationResult::new(&cell.cell_id, cell.index, cell.language.clone());
    result.add_warning(Diagnostic::new("Validation not performed").with_code(VALIDATION_SKIPPED));
    result
        .details
        .insert("reason".into(), Value::String("not validated".into()));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn cell(language: CellLanguage, content: &str) -> ScratchCell {
        ScratchCell {
            cell_id: "c".into(),
            index: 0,
            language,
            content: content.into(),
            validate: true,
            json_schema: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn plain_text_is_always_valid() {
        let result = validate_cell(&cell(CellLanguage::Txt, "anything"), &ValidationContext::default());
        assert!(result.valid);
        assert_eq!(result.details["reason"], "no validation performed");
        assert_eq!(result.warnings[0].code.as_deref(), Some(VALIDATION_SKIPPED));
    }

    #[test]
    fn code_without_checker_degrades_to_warning() {
        let result = validate_cell(&cell(CellLanguage::Py, "def f(:"), &ValidationContext::default());
        assert!(result.valid);
        assert_eq!(result.warnings[0].code.as_deref(), Some(VALIDATION_SKIPPED));
        assert_eq!(result.details["reason"], "not validated");
    }

    #[test]
    fn unknown_language_is_stored_valid_and_unvalidated() {
        let result = validate_cell(
            &cell(CellLanguage::from_name("sql"), "SELECT 1;"),
            &ValidationContext::default(),
        );
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings[0].code.as_deref(), Some(VALIDATION_SKIPPED));
        assert_eq!(result.details["reason"], "not validated");
    }

    #[tokio::test]
    async fn batch_validation_returns_per_cell_results() {
        let cells = vec![
            cell(CellLanguage::Json, "{\"a\": 1}"),
            cell(CellLanguage::Json, "{broken"),
        ];
        let results = validate_cells(cells, Arc::new(ValidationContext::default()), None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].valid);
        assert!(!results[1].valid);
    }

    #[tokio::test]
    async fn deadline_expiry_fails_with_validation_timeout() {
        struct SlowChecker;
        impl code::SyntaxChecker for SlowChecker {
            fn check(&self, _language: CellLanguage, _content: &str) -> code::SyntaxReport {
                std::thread::sleep(Duration::from_millis(300));
                code::SyntaxReport::default()
            }
        }

        let ctx = Arc::new(
            ValidationContext::default().with_syntax_checker(Arc::new(SlowChecker)),
        );
        let err = validate_cells(
            vec![cell(CellLanguage::Rs, "fn main() {}")],
            ctx,
            Some(Duration::from_millis(30)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationTimeout);
    }

    #[tokio::test]
    async fn zero_timeout_disables_the_deadline() {
        let cells = vec![cell(CellLanguage::Txt, "x")];
        let results = validate_cells(
            cells,
            Arc::new(ValidationContext::default()),
            Some(Duration::ZERO),
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 1);
    }
}
