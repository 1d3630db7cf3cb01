//! Namespace management tools.

use std::sync::Arc;

use serde_json::{json, Value};

use scratch_notebook_core::{ScratchError, ScratchResult};

use super::Handlers;

impl Handlers {
    pub(super) async fn scratch_namespace_list(&self, tenant: &str) -> ScratchResult<Value> {
        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let namespaces =
            tokio::task::spawn_blocking(move || store.list_namespaces(&tenant_owned))
                .await
                .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        Ok(json!({ "namespaces": namespaces }))
    }

    pub(super) async fn scratch_namespace_create(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let namespace = Self::require_str(args, "namespace")?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let (value, created) =
            tokio::task::spawn_blocking(move || store.register_namespace(&tenant_owned, &namespace))
                .await
                .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        Ok(json!({ "namespace": value, "created": created }))
    }

    pub(super) async fn scratch_namespace_rename(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let old_namespace = Self::require_str(args, "old_namespace")?;
        let new_namespace = Self::require_str(args, "new_namespace")?;
        let migrate = Self::optional_bool(args, "migrate_scratchpads", true)?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let (value, migrated_count) = tokio::task::spawn_blocking(move || {
            store.rename_namespace(&tenant_owned, &old_namespace, &new_namespace, migrate)
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        Ok(json!({ "namespace": value, "migrated_count": migrated_count }))
    }

    pub(super) async fn scratch_namespace_delete(&self, tenant: &str, args: &Value) -> ScratchResult<Value> {
        let namespace = Self::require_str(args, "namespace")?;
        let cascade = Self::optional_bool(args, "delete_scratchpads", false)?;

        let store = Arc::clone(&self.state.store);
        let tenant_owned = tenant.to_string();
        let (deleted, removed) = tokio::task::spawn_blocking(move || {
            store.delete_namespace(&tenant_owned, &namespace, cascade)
        })
        .await
        .map_err(|_| ScratchError::internal("Storage worker failed"))??;

        Ok(json!({ "deleted": deleted, "removed_scratchpads": removed }))
    }
}
