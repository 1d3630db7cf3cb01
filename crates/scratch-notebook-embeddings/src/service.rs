//! Semantic search service.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use scratch_notebook_core::{Config, ScratchError, ScratchResult, Scratchpad, SearchHit};
use scratch_notebook_storage::{CatalogStore, EmbeddingRecord, PadEmbedder};

use crate::backend::{select_backend, EmbeddingBackend};
use crate::documents::build_documents;

/// Embedding pipeline plus filtered k-NN queries.
///
/// The service implements [`PadEmbedder`], so the catalog calls back into it
/// inside every mutation and the vector rows commit with the content they
/// describe.
pub struct SearchService {
    store: Arc<CatalogStore>,
    backend: Arc<dyn EmbeddingBackend>,
    enabled: bool,
    batch_size: usize,
    max_limit: usize,
}

impl SearchService {
    pub fn new(config: &Config, store: Arc<CatalogStore>) -> ScratchResult<Self> {
        let backend = select_backend(&config.embedding_model, &config.embedding_device)?;
        if config.enable_semantic_search {
            info!(
                embedder = backend.name(),
                dimension = backend.dimension(),
                "semantic search enabled"
            );
        }
        Ok(Self {
            store,
            backend,
            enabled: config.enable_semantic_search,
            batch_size: config.embedding_batch_size,
            max_limit: config.semantic_search_limit,
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Active embedder identifier, reported with every search response.
    pub fn embedder_name(&self) -> &str {
        self.backend.name()
    }

    /// Embed the query and return filtered hits sorted by descending
    /// similarity. CPU-bound work runs on the blocking pool.
    pub async fn search(
        &self,
        tenant: &str,
        query: &str,
        namespaces: Option<Vec<String>>,
        tags: Option<Vec<String>>,
        limit: Option<usize>,
    ) -> ScratchResult<Vec<SearchHit>> {
        if !self.enabled {
            return Err(ScratchError::config("Semantic search is disabled"));
        }

        let effective_limit = limit.unwrap_or(10).clamp(1, self.max_limit);
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let batch_size = self.batch_size;
        let tenant = tenant.to_string();
        let query = query.to_string();
        let version = self.backend.name().to_string();

        let hits = tokio::task::spawn_blocking(move || -> ScratchResult<Vec<SearchHit>> {
            let vectors = backend.embed(&[query], batch_size)?;
            let query_vector = vectors
                .into_iter()
                .next()
                .ok_or_else(|| ScratchError::internal("Embedding backend returned no vector"))?;
            let scored = store.search_embeddings(
                &tenant,
                &query_vector,
                effective_limit,
                namespaces.as_deref(),
                tags.as_deref(),
                &version,
            )?;
            Ok(scored
                .into_iter()
                .map(|hit| SearchHit {
                    scratch_id: hit.record.scratch_id,
                    cell_id: hit.record.cell_id,
                    tenant_id: hit.record.tenant_id,
                    namespace: hit.record.namespace,
                    tags: hit.record.tags,
                    score: hit.score.clamp(0.0, 1.0),
                    snippet: hit.record.snippet,
                    embedding_version: hit.record.embedding_version,
                })
                .collect())
        })
        .await
        .map_err(|_| ScratchError::internal("Search worker failed"))??;

        Ok(hits)
    }
}

impl PadEmbedder for SearchService {
    fn embed_pad(&self, tenant: &str, pad: &Scratchpad) -> ScratchResult<Vec<EmbeddingRecord>> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let documents = build_documents(pad);
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.backend.embed(&texts, self.batch_size)?;
        if vectors.len() != documents.len() {
            return Err(ScratchError::internal(
                "Embedding backend returned a mismatched batch",
            ));
        }

        let now = Utc::now();
        Ok(documents
            .into_iter()
            .zip(vectors)
            .map(|(doc, vector)| EmbeddingRecord {
                scratch_id: pad.scratch_id.clone(),
                cell_id: doc.cell_id,
                tenant_id: tenant.to_string(),
                namespace: doc.namespace,
                tags: doc.tags,
                snippet: doc.snippet,
                cell_index: doc.cell_index,
                vector,
                embedding_version: self.backend.name().to_string(),
                updated_at: now,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scratch_notebook_core::{CellLanguage, EvictionPolicy, ScratchCell};
    use scratch_notebook_storage::StorageLimits;
    use serde_json::{json, Map};
    use std::collections::HashMap;

    fn test_config(enabled: bool) -> Config {
        let mut cli = serde_json::Map::new();
        cli.insert(
            "enable_semantic_search".into(),
            serde_json::Value::String(enabled.to_string()),
        );
        Config::load(cli, &HashMap::new()).unwrap()
    }

    fn service_with_store(enabled: bool) -> (tempfile::TempDir, Arc<CatalogStore>, SearchService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            CatalogStore::open(
                dir.path(),
                StorageLimits::unlimited(EvictionPolicy::Discard),
            )
            .unwrap(),
        );
        let service = SearchService::new(&test_config(enabled), Arc::clone(&store)).unwrap();
        (dir, store, service)
    }

    fn pad_with_cell(id: &str, namespace: &str, tags: &[&str], content: &str) -> Scratchpad {
        let mut metadata = Map::new();
        metadata.insert("namespace".into(), json!(namespace));
        metadata.insert("title".into(), json!(id));
        let mut pad = Scratchpad::new(id, metadata);
        let mut cell_meta = Map::new();
        if !tags.is_empty() {
            cell_meta.insert("tags".into(), json!(tags));
        }
        pad.cells.push(ScratchCell {
            cell_id: format!("{id}-c0"),
            index: 0,
            language: CellLanguage::Txt,
            content: content.into(),
            validate: false,
            json_schema: None,
            metadata: cell_meta,
        });
        pad
    }

    #[tokio::test]
    async fn disabled_search_is_a_config_error() {
        let (_dir, _store, service) = service_with_store(false);
        let err = service
            .search("default", "query", None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, scratch_notebook_core::ErrorCode::ConfigError);
    }

    #[tokio::test]
    async fn mutations_commit_embeddings_and_search_finds_them() {
        let (_dir, store, service) = service_with_store(true);
        store
            .create_pad(
                "default",
                pad_with_cell("deploy-notes", "release", &["deploy"], "ship the release"),
                &service,
            )
            .unwrap();

        let hits = service
            .search("default", "ship the release", None, None, Some(5))
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.tenant_id == "default"));
        assert_eq!(hits[0].embedding_version, "debug-hash");
        // identical text embeds identically, so the matching cell scores 1.0
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn filters_restrict_hits_to_matching_predicates() {
        let (_dir, store, service) = service_with_store(true);
        store
            .create_pad(
                "default",
                pad_with_cell("wanted", "release", &["deploy"], "target text"),
                &service,
            )
            .unwrap();
        store
            .create_pad(
                "default",
                pad_with_cell("other", "sandbox", &["misc"], "target text"),
                &service,
            )
            .unwrap();

        let hits = service
            .search(
                "default",
                "target text",
                Some(vec!["release".into()]),
                Some(vec!["deploy".into()]),
                Some(10),
            )
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.scratch_id == "wanted"));
    }

    #[tokio::test]
    async fn deleted_pads_leave_no_orphan_hits() {
        let (_dir, store, service) = service_with_store(true);
        store
            .create_pad(
                "default",
                pad_with_cell("gone", "ns", &[], "ephemeral"),
                &service,
            )
            .unwrap();
        store.delete_pad("default", "gone").unwrap();

        let hits = service
            .search("default", "ephemeral", None, None, Some(10))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn disabled_service_produces_no_rows() {
        let (_dir, _store, service) = service_with_store(false);
        let rows = service
            .embed_pad("default", &pad_with_cell("p", "ns", &[], "text"))
            .unwrap();
        assert!(rows.is_empty());
    }
}
