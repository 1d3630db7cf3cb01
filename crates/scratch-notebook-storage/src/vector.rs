//! Filtered nearest-neighbor search over the embeddings column family.
//!
//! Tenant, namespace, tag, and embedding-version predicates are applied
//! while scanning, before the top-k heap truncates, so a filtered query can
//! never be starved by unfiltered high scorers. Ties in similarity break by
//! ascending `(scratch_id, cell_id)` for stable orderings.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use scratch_notebook_core::ScratchResult;

use crate::column_families::CF_EMBEDDINGS;
use crate::keys;
use crate::records::EmbeddingRecord;
use crate::store::{namespace_matches, tags_match, CatalogStore};

/// An embedding row with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredEmbedding {
    pub record: EmbeddingRecord,
    pub score: f32,
}

impl ScoredEmbedding {
    /// Total order: higher score first, then ascending `(scratch_id,
    /// cell_id)`.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        match self.score.partial_cmp(&other.score) {
            Some(Ordering::Equal) | None => {
                let lhs = (&self.record.scratch_id, &self.record.cell_id);
                let rhs = (&other.record.scratch_id, &other.record.cell_id);
                rhs.cmp(&lhs)
            }
            Some(ordering) => ordering,
        }
    }
}

impl PartialEq for ScoredEmbedding {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredEmbedding {}

impl PartialOrd for ScoredEmbedding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank_cmp(other))
    }
}

impl Ord for ScoredEmbedding {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

/// Cosine similarity of two vectors; 0 when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len().min(b.len()) {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl CatalogStore {
    /// Top-k embedding rows for the tenant by cosine similarity, with
    /// namespace/tag/version predicates pushed below the limit.
    pub fn search_embeddings(
        &self,
        tenant: &str,
        query: &[f32],
        limit: usize,
        namespaces: Option<&[String]>,
        tags: Option<&[String]>,
        embedding_version: &str,
    ) -> ScratchResult<Vec<ScoredEmbedding>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // min-heap of the current top k (Reverse orders worst-first)
        let mut heap: BinaryHeap<std::cmp::Reverse<ScoredEmbedding>> = BinaryHeap::new();
        let prefix = keys::tenant_prefix(tenant);
        for (_, value) in self.prefix_scan(CF_EMBEDDINGS, &prefix)? {
            let record: EmbeddingRecord = serde_json::from_slice(&value).map_err(|_| {
                scratch_notebook_core::ScratchError::internal("Storage row is corrupt")
            })?;
            if record.embedding_version != embedding_version {
                continue;
            }
            if !namespace_matches(record.namespace.as_deref(), namespaces) {
                continue;
            }
            if !tags_match(&record.tags, &[], tags) {
                continue;
            }
            let score = cosine_similarity(query, &record.vector);
            let scored = ScoredEmbedding { record, score };
            if heap.len() < limit {
                heap.push(std::cmp::Reverse(scored));
            } else if let Some(worst) = heap.peek() {
                if scored > worst.0 {
                    heap.pop();
                    heap.push(std::cmp::Reverse(scored));
                }
            }
        }

        let mut hits: Vec<ScoredEmbedding> = heap.into_iter().map(|r| r.0).collect();
        hits.sort_by(|a, b| b.cmp(a));
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::tests::open_store;
    use super::*;
    use chrono::Utc;
    use rocksdb::WriteBatch;
    use scratch_notebook_core::EvictionPolicy;

    fn put_row(
        store: &CatalogStore,
        tenant: &str,
        scratch_id: &str,
        cell_id: Option<&str>,
        namespace: Option<&str>,
        tags: &[&str],
        vector: Vec<f32>,
    ) {
        let record = EmbeddingRecord {
            scratch_id: scratch_id.into(),
            cell_id: cell_id.map(str::to_string),
            tenant_id: tenant.into(),
            namespace: namespace.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            snippet: String::new(),
            cell_index: cell_id.map(|_| 0).unwrap_or(-1),
            vector,
            embedding_version: "debug-hash".into(),
            updated_at: Utc::now(),
        };
        let mut batch = WriteBatch::default();
        store
            .put_record(
                &mut batch,
                CF_EMBEDDINGS,
                keys::embedding_key(tenant, scratch_id, cell_id),
                &record,
            )
            .unwrap();
        store.write(batch).unwrap();
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn predicates_apply_before_top_k() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        // many perfect-scoring rows outside the filter...
        for i in 0..20 {
            put_row(
                &store,
                "default",
                &format!("noise-{i:02}"),
                None,
                Some("other"),
                &[],
                vec![1.0, 0.0],
            );
        }
        // ...and one weaker row inside it
        put_row(
            &store,
            "default",
            "wanted",
            None,
            Some("release"),
            &["deploy"],
            vec![0.5, 0.5],
        );

        let namespaces = vec!["release".to_string()];
        let tags = vec!["deploy".to_string()];
        let hits = store
            .search_embeddings(
                "default",
                &[1.0, 0.0],
                5,
                Some(&namespaces),
                Some(&tags),
                "debug-hash",
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.scratch_id, "wanted");
    }

    #[test]
    fn results_are_tenant_scoped() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        put_row(&store, "tenant-a", "a", None, None, &[], vec![1.0]);
        put_row(&store, "tenant-b", "b", None, None, &[], vec![1.0]);
        let hits = store
            .search_embeddings("tenant-a", &[1.0], 10, None, None, "debug-hash")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.tenant_id, "tenant-a");
    }

    #[test]
    fn ties_break_by_scratch_then_cell_id() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        put_row(&store, "default", "bbb", None, None, &[], vec![1.0, 0.0]);
        put_row(&store, "default", "aaa", Some("c2"), None, &[], vec![1.0, 0.0]);
        put_row(&store, "default", "aaa", Some("c1"), None, &[], vec![1.0, 0.0]);

        let hits = store
            .search_embeddings("default", &[1.0, 0.0], 10, None, None, "debug-hash")
            .unwrap();
        let order: Vec<_> = hits
            .iter()
            .map(|h| (h.record.scratch_id.clone(), h.record.cell_id.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("aaa".to_string(), Some("c1".to_string())),
                ("aaa".to_string(), Some("c2".to_string())),
                ("bbb".to_string(), None),
            ]
        );
    }

    #[test]
    fn stale_embedding_versions_are_skipped() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        put_row(&store, "default", "current", None, None, &[], vec![1.0]);
        let hits = store
            .search_embeddings("default", &[1.0], 10, None, None, "other-model")
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn limit_truncates_after_scoring() {
        let (_dir, store) = open_store(EvictionPolicy::Discard);
        for i in 0..10 {
            let x = (i as f32) / 10.0;
            put_row(
                &store,
                "default",
                &format!("pad-{i}"),
                None,
                None,
                &[],
                vec![x, 1.0 - x],
            );
        }
        let hits = store
            .search_embeddings("default", &[1.0, 0.0], 3, None, None, "debug-hash")
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
        assert_eq!(hits[0].record.scratch_id, "pad-9");
    }
}
