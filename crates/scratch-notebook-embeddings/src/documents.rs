//! Embedding document construction.
//!
//! Each pad indexes one pad-level document (canonical metadata plus all
//! cell content) and one document per cell, so hits can point either at a
//! whole pad or a specific cell.

use scratch_notebook_core::types::merge_tags;
use scratch_notebook_core::Scratchpad;

const SNIPPET_LIMIT: usize = 240;

/// One unit of text to embed.
#[derive(Debug, Clone)]
pub struct EmbeddingDocument {
    pub text: String,
    pub snippet: String,
    pub namespace: Option<String>,
    pub tags: Vec<String>,
    /// `None` for the pad-level document.
    pub cell_id: Option<String>,
    /// `-1` for the pad-level document.
    pub cell_index: i64,
}

/// Build the pad-level document plus one document per cell.
pub fn build_documents(pad: &Scratchpad) -> Vec<EmbeddingDocument> {
    let namespace = pad.namespace().map(str::to_string);
    let pad_tags = pad.declared_tags();
    let metadata_parts: Vec<&str> = [pad.title(), pad.description(), pad.summary()]
        .into_iter()
        .flatten()
        .collect();

    let mut pad_text_parts: Vec<String> =
        metadata_parts.iter().map(|part| part.to_string()).collect();
    for cell in &pad.cells {
        let trimmed = cell.content.trim();
        if !trimmed.is_empty() {
            pad_text_parts.push(trimmed.to_string());
        }
    }
    let pad_text = pad_text_parts.join("\n");

    let mut documents = vec![EmbeddingDocument {
        snippet: build_snippet(&pad_text, &metadata_parts),
        text: pad_text,
        namespace: namespace.clone(),
        tags: pad_tags.clone(),
        cell_id: None,
        cell_index: -1,
    }];

    for cell in &pad.cells {
        let cell_tags = cell.tags();
        let text = cell.content.trim().to_string();
        documents.push(EmbeddingDocument {
            snippet: build_snippet(&text, &metadata_parts),
            text,
            namespace: namespace.clone(),
            tags: merge_tags([pad_tags.as_slice(), cell_tags.as_slice()]),
            cell_id: Some(cell.cell_id.clone()),
            cell_index: cell.index as i64,
        });
    }
    documents
}

/// Canonical metadata followed by content, truncated to 240 chars with an
/// ellipsis.
pub fn build_snippet(text: &str, metadata_parts: &[&str]) -> String {
    let mut parts: Vec<&str> = metadata_parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect();
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed);
    }
    let combined = parts.join(" ");
    if combined.chars().count() <= SNIPPET_LIMIT {
        return combined;
    }
    let truncated: String = combined.chars().take(SNIPPET_LIMIT - 3).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scratch_notebook_core::{CellLanguage, ScratchCell};
    use serde_json::{json, Map};

    fn pad() -> Scratchpad {
        let mut metadata = Map::new();
        metadata.insert("title".into(), json!("Release notes"));
        metadata.insert("namespace".into(), json!("release"));
        metadata.insert("tags".into(), json!(["pad-tag"]));
        let mut pad = Scratchpad::new("p", metadata);
        let mut cell_meta = Map::new();
        cell_meta.insert("tags".into(), json!(["cell-tag"]));
        pad.cells.push(ScratchCell {
            cell_id: "c1".into(),
            index: 0,
            language: CellLanguage::Md,
            content: "# v1.2 shipped".into(),
            validate: false,
            json_schema: None,
            metadata: cell_meta,
        });
        pad
    }

    #[test]
    fn pad_document_comes_first_with_cell_index_minus_one() {
        let docs = build_documents(&pad());
        assert_eq!(docs.len(), 2);
        assert!(docs[0].cell_id.is_none());
        assert_eq!(docs[0].cell_index, -1);
        assert!(docs[0].text.contains("Release notes"));
        assert!(docs[0].text.contains("# v1.2 shipped"));
    }

    #[test]
    fn cell_documents_merge_pad_and_cell_tags() {
        let docs = build_documents(&pad());
        assert_eq!(docs[1].cell_id.as_deref(), Some("c1"));
        assert_eq!(docs[1].tags, vec!["pad-tag", "cell-tag"]);
        assert_eq!(docs[1].namespace.as_deref(), Some("release"));
    }

    #[test]
    fn snippet_truncates_with_ellipsis() {
        let long = "x".repeat(500);
        let snippet = build_snippet(&long, &["Title"]);
        assert_eq!(snippet.chars().count(), 240);
        assert!(snippet.ends_with("..."));
        assert!(snippet.starts_with("Title "));
    }

    #[test]
    fn snippet_keeps_short_text_intact() {
        assert_eq!(build_snippet("body", &["T"]), "T body");
        assert_eq!(build_snippet("", &[]), "");
    }
}
