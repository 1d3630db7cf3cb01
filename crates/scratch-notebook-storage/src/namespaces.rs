//! Namespace registry operations.
//!
//! Namespaces are registry rows plus whatever pads declare, so a namespace
//! can exist with zero pads and a pad write auto-registers its namespace.
//! Rename-with-cascade rewrites pads, their embedding rows, and the registry
//! row in one commit.

use chrono::Utc;
use rocksdb::WriteBatch;

use scratch_notebook_core::{ScratchError, ScratchResult};

use crate::column_families::{CF_EMBEDDINGS, CF_NAMESPACES, CF_PADS};
use crate::keys;
use crate::records::{EmbeddingRecord, NamespaceRecord, PadRecord};
use crate::store::{CatalogStore, NamespaceListing};

fn normalize_namespace(namespace: &str) -> ScratchResult<String> {
    let trimmed = namespace.trim();
    if trimmed.is_empty() {
        return Err(ScratchError::validation("Namespace must not be empty"));
    }
    Ok(trimmed.to_string())
}

impl CatalogStore {
    /// Register a namespace for the tenant. Returns `(name, created)`.
    pub fn register_namespace(&self, tenant: &str, namespace: &str) -> ScratchResult<(String, bool)> {
        let normalized = normalize_namespace(namespace)?;
        let _guard = self.write_lock.lock();

        let key = keys::namespace_key(tenant, &normalized);
        let existing: Option<NamespaceRecord> = self.get_record(CF_NAMESPACES, &key)?;
        if existing.is_some() {
            return Ok((normalized, false));
        }
        let record = NamespaceRecord {
            namespace: normalized.clone(),
            tenant_id: tenant.to_string(),
            created_at: Utc::now(),
        };
        let mut batch = WriteBatch::default();
        self.put_record(&mut batch, CF_NAMESPACES, key, &record)?;
        self.write(batch)?;
        Ok((normalized, true))
    }

    /// Registry rows unioned with namespaces observed on pads, with per-
    /// namespace pad counts, sorted by name.
    pub fn list_namespaces(&self, tenant: &str) -> ScratchResult<Vec<NamespaceListing>> {
        let mut counts: std::collections::BTreeMap<String, usize> = Default::default();
        for name in self.registered_namespaces(tenant)? {
            counts.entry(name).or_insert(0);
        }
        for record in self.tenant_pad_records(tenant)? {
            if let Some(namespace) = record.namespace {
                *counts.entry(namespace).or_insert(0) += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(namespace, scratchpad_count)| NamespaceListing {
                namespace,
                scratchpad_count,
            })
            .collect())
    }

    /// Rename a namespace. With `migrate = true` every pad in the source
    /// namespace (and its embedding rows) moves to the target in the same
    /// commit; with `migrate = false` a populated source is a `CONFLICT`.
    pub fn rename_namespace(
        &self,
        tenant: &str,
        old_namespace: &str,
        new_namespace: &str,
        migrate: bool,
    ) -> ScratchResult<(String, usize)> {
        let source = normalize_namespace(old_namespace)?;
        let target = normalize_namespace(new_namespace)?;

        if source == target {
            let (name, _) = self.register_namespace(tenant, &target)?;
            return Ok((name, 0));
        }

        let _guard = self.write_lock.lock();

        let registered = self.registered_namespaces(tenant)?;
        if !registered.contains(&source) {
            return Err(ScratchError::not_found(format!("Namespace '{source}' not found")));
        }
        if registered.contains(&target) {
            return Err(ScratchError::conflict(format!(
                "Namespace '{target}' already exists"
            )));
        }

        let members: Vec<PadRecord> = self
            .tenant_pad_records(tenant)?
            .into_iter()
            .filter(|r| r.namespace.as_deref() == Some(source.as_str()))
            .collect();
        if !members.is_empty() && !migrate {
            return Err(ScratchError::conflict(format!(
                "Namespace '{source}' has {} scratchpad(s); set migrate_scratchpads=true to rename",
                members.len()
            )));
        }

        let now = Utc::now();
        let mut batch = WriteBatch::default();
        let mut migrated = 0;
        for mut record in members {
            record.namespace = Some(target.clone());
            record
                .metadata
                .insert("namespace".into(), serde_json::Value::String(target.clone()));
            record.last_access_at = record.last_access_at.max(now);
            record.updated_at = now;
            self.put_record(
                &mut batch,
                CF_PADS,
                keys::pad_key(tenant, &record.scratch_id),
                &record,
            )?;

            let embeddings_cf = self.cf(CF_EMBEDDINGS)?;
            let scope = keys::pad_scope_prefix(tenant, &record.scratch_id);
            for (key, value) in self.prefix_scan(CF_EMBEDDINGS, &scope)? {
                let mut row: EmbeddingRecord = serde_json::from_slice(&value)
                    .map_err(|_| ScratchError::internal("Storage row is corrupt"))?;
                row.namespace = Some(target.clone());
                let bytes = serde_json::to_vec(&row)
                    .map_err(|_| ScratchError::internal("Storage row serialization failed"))?;
                batch.put_cf(embeddings_cf, key, bytes);
            }
            migrated += 1;
        }

        let namespaces_cf = self.cf(CF_NAMESPACES)?;
        batch.delete_cf(namespaces_cf, keys::namespace_key(tenant, &source));
        let record = NamespaceRecord {
            namespace: target.clone(),
            tenant_id: tenant.to_string(),
            created_at: now,
        };
        self.put_record(
            &mut batch,
            CF_NAMESPACES,
            keys::namespace_key(tenant, &target),
            &record,
        )?;

        self.write(batch)?;
        Ok((target, migrated))
    }

    /// Delete a namespace. With `cascade = true` member pads are deleted in
    /// the same commit; with `cascade = false` a populated namespace is a
    /// `CONFLICT`. Returns `(registry_row_deleted, pads_removed)`.
    pub fn delete_namespace(
        &self,
        tenant: &str,
        namespace: &str,
        cascade: bool,
    ) -> ScratchResult<(bool, usize)> {
        let normalized = normalize_namespace(namespace)?;
        let _guard = self.write_lock.lock();

        let members: Vec<String> = self
            .tenant_pad_records(tenant)?
            .into_iter()
            .filter(|r| r.namespace.as_deref() == Some(normalized.as_str()))
            .map(|r| r.scratch_id)
            .collect();
        if !members.is_empty() && !cascade {
            return Err(ScratchError::conflict(format!(
                "Namespace '{normalized}' cannot be deleted while {} scratchpad(s) reference it",
                members.len()
            )));
        }

        let key = keys::namespace_key(tenant, &normalized);
        let registered: Option<NamespaceRecord> = self.get_record(CF_NAMESPACES, &key)?;
        if registered.is_none() && members.is_empty() {
            return Ok((false, 0));
        }

        let mut batch = WriteBatch::default();
        for scratch_id in &members {
            self.stage_pad_delete(&mut batch, tenant, scratch_id)?;
        }
        let deleted = registered.is_some();
        if deleted {
            let namespaces_cf = self.cf(CF_NAMESPACES)?;
            batch.delete_cf(namespaces_cf, key);
        }
        self.write(batch)?;
        Ok((deleted, members.len()))
    }

    fn registered_namespaces(&self, tenant: &str) -> ScratchResult<Vec<String>> {
        let prefix = keys::tenant_prefix(tenant);
        let mut names = Vec::new();
        for (_, value) in self.prefix_scan(CF_NAMESPACES, &prefix)? {
            let record: NamespaceRecord = serde_json::from_slice(&value)
                .map_err(|_| ScratchError::internal("Storage row is corrupt"))?;
            names.push(record.namespace);
        }
        Ok(names)
    }
}
