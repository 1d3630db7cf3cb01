//! Row types stored in the catalog column families.
//!
//! Rows serialize as JSON: metadata and schema payloads are arbitrary JSON
//! values, so a self-describing encoding keeps them round-trippable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use scratch_notebook_core::types::PadListing;
use scratch_notebook_core::{ScratchCell, Scratchpad};

/// Columnar pad row. Denormalized columns (`title`, `tags`, `cell_tags`,
/// `cell_count`) serve listings without loading cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PadRecord {
    pub scratch_id: String,
    pub tenant_id: String,
    pub namespace: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub cell_tags: Vec<String>,
    pub cell_count: usize,
    pub metadata: Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
}

impl PadRecord {
    /// Build the row for a normalized pad.
    pub fn from_pad(
        tenant: &str,
        pad: &Scratchpad,
        created_at: DateTime<Utc>,
        last_access_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            scratch_id: pad.scratch_id.clone(),
            tenant_id: tenant.to_string(),
            namespace: pad.namespace().map(str::to_string),
            title: pad.title().map(str::to_string),
            description: pad.description().map(str::to_string),
            summary: pad.summary().map(str::to_string),
            tags: pad.aggregated_tags(),
            cell_tags: pad.cell_tags(),
            cell_count: pad.cells.len(),
            metadata: pad.metadata.clone(),
            created_at,
            updated_at: now,
            last_access_at,
        }
    }

    /// Reassemble the domain pad from its row and cell rows.
    pub fn into_pad(self, mut cells: Vec<ScratchCell>) -> Scratchpad {
        cells.sort_by_key(|c| c.index);
        Scratchpad {
            scratch_id: self.scratch_id,
            cells,
            metadata: self.metadata,
        }
    }

    pub fn to_listing(&self) -> PadListing {
        PadListing {
            scratch_id: self.scratch_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            namespace: self.namespace.clone(),
            cell_count: self.cell_count,
        }
    }
}

/// Namespace registry row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub namespace: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
}

/// Embedding row. `cell_id = None` is the pad-level document
/// (`cell_index = -1`); every row references a live `(scratch_id, cell_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub scratch_id: String,
    pub cell_id: Option<String>,
    pub tenant_id: String,
    pub namespace: Option<String>,
    pub tags: Vec<String>,
    pub snippet: String,
    pub cell_index: i64,
    pub vector: Vec<f32>,
    pub embedding_version: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scratch_notebook_core::CellLanguage;
    use serde_json::json;

    fn pad_with_cells() -> Scratchpad {
        let mut metadata = Map::new();
        metadata.insert("title".into(), json!("T"));
        metadata.insert("namespace".into(), json!("ns"));
        metadata.insert("tags".into(), json!(["p"]));
        let mut pad = Scratchpad::new("pad", metadata);
        let mut cell_meta = Map::new();
        cell_meta.insert("tags".into(), json!(["c"]));
        pad.cells.push(ScratchCell {
            cell_id: "c1".into(),
            index: 0,
            language: CellLanguage::Txt,
            content: "body".into(),
            validate: false,
            json_schema: None,
            metadata: cell_meta,
        });
        pad
    }

    #[test]
    fn record_denormalizes_listing_columns() {
        let pad = pad_with_cells();
        let now = Utc::now();
        let record = PadRecord::from_pad("tenant", &pad, now, now, now);
        assert_eq!(record.title.as_deref(), Some("T"));
        assert_eq!(record.namespace.as_deref(), Some("ns"));
        assert_eq!(record.tags, vec!["p", "c"]);
        assert_eq!(record.cell_tags, vec!["c"]);
        assert_eq!(record.cell_count, 1);
    }

    #[test]
    fn into_pad_sorts_cells_by_index() {
        let pad = pad_with_cells();
        let now = Utc::now();
        let record = PadRecord::from_pad("tenant", &pad, now, now, now);
        let mut c0 = pad.cells[0].clone();
        c0.index = 1;
        let mut c1 = pad.cells[0].clone();
        c1.cell_id = "c0".into();
        c1.index = 0;
        let rebuilt = record.into_pad(vec![c0, c1]);
        assert_eq!(rebuilt.cells[0].cell_id, "c0");
        assert_eq!(rebuilt.cells[1].cell_id, "c1");
    }

    #[test]
    fn record_round_trips_through_json() {
        let pad = pad_with_cells();
        let now = Utc::now();
        let record = PadRecord::from_pad("tenant", &pad, now, now, now);
        let bytes = serde_json::to_vec(&record).unwrap();
        let back: PadRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.scratch_id, "pad");
        assert_eq!(back.metadata["title"], "T");
    }
}
