//! Domain types: scratchpads, cells, languages, tags, schema registry
//! entries, validation results, and search hits.

mod cell;
mod language;
mod pad;
mod schema_registry;
mod search;
mod tags;
mod validation;

pub use cell::ScratchCell;
pub use language::CellLanguage;
pub use pad::{PadListing, Scratchpad, CANONICAL_METADATA_FIELDS};
pub use schema_registry::{normalize_schema_registry, SchemaEntry};
pub use search::{SearchHit, TagListing};
pub use tags::{merge_tags, normalize_tags, tags_from_value};
pub use validation::{Diagnostic, ValidationResult};
