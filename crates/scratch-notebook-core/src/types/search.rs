//! Search and tag-listing payload types.

use serde::{Deserialize, Serialize};

/// One semantic-search hit. `cell_id` is `None` for the pad-level document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub scratch_id: String,
    pub cell_id: Option<String>,
    pub tenant_id: String,
    pub namespace: Option<String>,
    pub tags: Vec<String>,
    pub score: f32,
    pub snippet: String,
    pub embedding_version: String,
}

/// Aggregated tag listing for a tenant, optionally namespace-filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagListing {
    pub scratchpad_tags: Vec<String>,
    pub cell_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_filter: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_serializes_null_cell_id() {
        let hit = SearchHit {
            scratch_id: "p".into(),
            cell_id: None,
            tenant_id: "default".into(),
            namespace: Some("release".into()),
            tags: vec!["deploy".into()],
            score: 0.75,
            snippet: "snippet".into(),
            embedding_version: "debug-hash".into(),
        };
        let value = serde_json::to_value(&hit).unwrap();
        assert!(value["cell_id"].is_null());
        assert_eq!(value["embedding_version"], "debug-hash");
    }

    #[test]
    fn tag_listing_omits_absent_filter() {
        let listing = TagListing::default();
        let value = serde_json::to_value(&listing).unwrap();
        assert!(value.get("namespace_filter").is_none());
    }
}
