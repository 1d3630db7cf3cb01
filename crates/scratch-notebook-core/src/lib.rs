//! Core domain model for the scratch notebook service.
//!
//! This crate holds everything the storage, embeddings, and server crates
//! agree on: scratchpad and cell types, the unified error taxonomy, the
//! typed configuration value built once at startup, and the advisory
//! validation pipeline.

pub mod config;
pub mod error;
pub mod types;
pub mod validation;

pub use config::{Config, EvictionPolicy};
pub use error::{ErrorCode, ScratchError, ScratchResult};
pub use types::{
    CellLanguage, Diagnostic, ScratchCell, Scratchpad, SchemaEntry, SearchHit, TagListing,
    ValidationResult,
};

/// Tenant identifier used when authentication is disabled.
pub const DEFAULT_TENANT_ID: &str = "default";
