//! Semantic search and tag listing tools.

use std::sync::Arc;

use serde_json::{json, Value};

use scratch_notebook_core::{ScratchError, ScratchResult};

use super::Handlers;

impl Handlers {
    pub(super) async fn scratch_search(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let query = Self::require_str(args, "query")?;
        let namespaces = Self::string_filter(args, "namespaces")?;
        let tags = Self::string_filter(args, "tags")?;
        let limit = Self::optional_limit(args, "limit")?;

        let hits = self
            .state
            .search
            .search(tenant, &query, namespaces, tags, limit)
            .await?;

        self.record_operation("search");
        Ok(json!({
            "hits": serde_json::to_value(&hits)
                .map_err(|_| ScratchError::internal("Response serialization failed"))?,
            "embedder": self.state.search.embedder_name(),
        }))
    }

    pub(super) async fn scratch_list_tags(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let namespaces = Self::string_filter(args, "namespaces")?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let listing = tokio::task::spawn_blocking(move || {
            store.list_tags(&tenant_owned, namespaces.as_deref())
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        self.record_operation("list_tags");
        serde_json::to_value(&listing)
            .map_err(|_| ScratchError::internal("Response serialization failed"))
    }
}
