//! Read-time cell selection.

use scratch_notebook_core::{ScratchCell, ScratchError, ScratchResult, Scratchpad};

/// Filters accepted by pad reads and cell listings.
#[derive(Debug, Clone, Default)]
pub struct ReadFilter {
    /// Restrict to these cell ids, preserving request order. Unknown ids are
    /// `NOT_FOUND`.
    pub cell_ids: Option<Vec<String>>,
    /// Keep cells whose tag set intersects these tags.
    pub tags: Option<Vec<String>>,
    /// Assert the pad belongs to one of these namespaces (`CONFLICT`
    /// otherwise).
    pub namespaces: Option<Vec<String>>,
}

/// Select cells by id and tag. When both filters are present the result is
/// their intersection, ordered by the id list.
pub fn select_cells(pad: &Scratchpad, filter: &ReadFilter) -> ScratchResult<Vec<ScratchCell>> {
    let mut selected: Vec<ScratchCell> = match &filter.cell_ids {
        Some(cell_ids) => {
            let mut picked = Vec::new();
            let mut seen = std::collections::HashSet::new();
            for cell_id in cell_ids {
                let cell = pad
                    .cells
                    .iter()
                    .find(|c| &c.cell_id == cell_id)
                    .ok_or_else(|| {
                        ScratchError::not_found(format!("Cell id {cell_id} not found"))
                            .with_details(serde_json::json!({ "cell_id": cell_id }))
                    })?;
                if seen.insert(cell_id.clone()) {
                    picked.push(cell.clone());
                }
            }
            picked
        }
        None => pad.cells.clone(),
    };

    if let Some(tags) = &filter.tags {
        if !tags.is_empty() {
            let wanted: std::collections::HashSet<&str> = tags.iter().map(String::as_str).collect();
            selected.retain(|cell| cell.tags().iter().any(|t| wanted.contains(t.as_str())));
        }
    }

    Ok(selected)
}

/// Check a pad against a namespace assertion.
pub fn check_namespace(pad: &Scratchpad, filter: &ReadFilter) -> ScratchResult<()> {
    let Some(namespaces) = &filter.namespaces else {
        return Ok(());
    };
    if namespaces.is_empty() {
        return Ok(());
    }
    let pad_namespace = pad.namespace().unwrap_or("");
    if namespaces.iter().any(|ns| ns == pad_namespace) {
        return Ok(());
    }
    Err(
        ScratchError::conflict("Scratchpad does not belong to an allowed namespace").with_details(
            serde_json::json!({
                "scratch_id": pad.scratch_id,
                "namespace": pad.namespace(),
            }),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scratch_notebook_core::CellLanguage;
    use serde_json::{json, Map};

    fn pad() -> Scratchpad {
        let mut metadata = Map::new();
        metadata.insert("namespace".into(), json!("release"));
        let mut pad = Scratchpad::new("p", metadata);
        for (id, tags) in [("a", json!(["x"])), ("b", json!(["y"])), ("c", json!(["x", "y"]))] {
            let mut cell_meta = Map::new();
            cell_meta.insert("tags".into(), tags);
            pad.cells.push(ScratchCell {
                cell_id: id.into(),
                index: pad.cells.len(),
                language: CellLanguage::Txt,
                content: id.into(),
                validate: false,
                json_schema: None,
                metadata: cell_meta,
            });
        }
        pad
    }

    #[test]
    fn no_filter_returns_all_cells() {
        let cells = select_cells(&pad(), &ReadFilter::default()).unwrap();
        assert_eq!(cells.len(), 3);
    }

    #[test]
    fn id_selection_preserves_request_order() {
        let filter = ReadFilter {
            cell_ids: Some(vec!["c".into(), "a".into()]),
            ..Default::default()
        };
        let cells = select_cells(&pad(), &filter).unwrap();
        let ids: Vec<_> = cells.iter().map(|c| c.cell_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn unknown_cell_id_is_not_found() {
        let filter = ReadFilter {
            cell_ids: Some(vec!["zzz".into()]),
            ..Default::default()
        };
        let err = select_cells(&pad(), &filter).unwrap_err();
        assert_eq!(err.code, scratch_notebook_core::ErrorCode::NotFound);
    }

    #[test]
    fn ids_and_tags_intersect() {
        let filter = ReadFilter {
            cell_ids: Some(vec!["a".into(), "b".into()]),
            tags: Some(vec!["y".into()]),
            ..Default::default()
        };
        let cells = select_cells(&pad(), &filter).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].cell_id, "b");
    }

    #[test]
    fn namespace_mismatch_is_conflict() {
        let filter = ReadFilter {
            namespaces: Some(vec!["other".into()]),
            ..Default::default()
        };
        let err = check_namespace(&pad(), &filter).unwrap_err();
        assert_eq!(err.code, scratch_notebook_core::ErrorCode::Conflict);
    }

    #[test]
    fn namespace_match_passes() {
        let filter = ReadFilter {
            namespaces: Some(vec!["release".into(), "other".into()]),
            ..Default::default()
        };
        assert!(check_namespace(&pad(), &filter).is_ok());
    }
}
