//! Scratch cell type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::language::CellLanguage;
use super::tags::tags_from_value;

/// A single typed unit of content within a scratchpad.
///
/// Cells are addressed by `cell_id` for every mutation; `index` is the
/// presentation-only ordinal and always forms the contiguous range
/// `[0, len)` within a pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScratchCell {
    pub cell_id: String,
    pub index: usize,
    pub language: CellLanguage,
    pub content: String,
    #[serde(default)]
    pub validate: bool,
    /// Inline JSON Schema object, a string to be parsed as one, or a
    /// `scratchpad://schemas/<name>` reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ScratchCell {
    /// Tags declared on the cell's metadata, normalized.
    pub fn tags(&self) -> Vec<String> {
        tags_from_value(self.metadata.get("tags"))
    }

    /// UTF-8 byte length of the content; the unit `max_cell_bytes` bounds.
    pub fn content_bytes(&self) -> usize {
        self.content.len()
    }

    /// Listing payload: ids, index, language, tags, metadata. No content.
    pub fn to_listing_value(&self) -> Value {
        let mut item = serde_json::json!({
            "cell_id": self.cell_id,
            "index": self.index,
            "language": self.language.clone(),
        });
        let tags = self.tags();
        if !tags.is_empty() {
            item["tags"] = Value::from(tags);
        }
        if !self.metadata.is_empty() {
            item["metadata"] = Value::Object(self.metadata.clone());
        }
        item
    }

    /// Full payload including content, used by read responses.
    pub fn to_content_value(&self) -> Value {
        let mut item = self.to_listing_value();
        item["content"] = Value::String(self.content.clone());
        item["validate"] = Value::Bool(self.validate);
        if let Some(schema) = &self.json_schema {
            item["json_schema"] = schema.clone();
        }
        item
    }
}
