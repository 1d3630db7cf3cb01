//! The catalog store: RocksDB wrapper and pad CRUD.
//!
//! # Thread safety
//! RocksDB's `DB` is internally thread-safe; the store adds a single write
//! lock so check-then-insert sequences (id uniqueness, capacity decisions)
//! are serialized and concurrent creators race with a deterministic winner.
//!
//! # Durability
//! Every mutation goes through one `WriteBatch` written with `sync = true`,
//! so a batch is either fully visible after success or absent after a crash.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{Cache, ColumnFamily, WriteBatch, WriteOptions, DB};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use scratch_notebook_core::types::PadListing;
use scratch_notebook_core::{
    Config, EvictionPolicy, ScratchCell, ScratchError, ScratchResult, Scratchpad, TagListing,
    DEFAULT_TENANT_ID,
};

use crate::column_families::{get_cf_descriptors, CF_CELLS, CF_EMBEDDINGS, CF_NAMESPACES, CF_PADS};
use crate::filter::{check_namespace, ReadFilter};
use crate::keys;
use crate::records::{EmbeddingRecord, NamespaceRecord, PadRecord};
use crate::PadEmbedder;

const BLOCK_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// Capacity limits and the active eviction policy, fixed at startup.
#[derive(Debug, Clone)]
pub struct StorageLimits {
    pub max_scratchpads: usize,
    pub max_cells_per_pad: usize,
    pub max_cell_bytes: usize,
    pub eviction_policy: EvictionPolicy,
}

impl StorageLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_scratchpads: config.max_scratchpads,
            max_cells_per_pad: config.max_cells_per_pad,
            max_cell_bytes: config.max_cell_bytes,
            eviction_policy: config.eviction_policy,
        }
    }

    /// Unlimited everything with the given policy; used by tests.
    pub fn unlimited(policy: EvictionPolicy) -> Self {
        Self {
            max_scratchpads: 0,
            max_cells_per_pad: 0,
            max_cell_bytes: 0,
            eviction_policy: policy,
        }
    }
}

/// Namespace listing entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NamespaceListing {
    pub namespace: String,
    pub scratchpad_count: usize,
}

/// RocksDB-backed catalog.
pub struct CatalogStore {
    pub(crate) db: DB,
    #[allow(dead_code)]
    cache: Cache,
    pub(crate) limits: StorageLimits,
    pub(crate) write_lock: Mutex<()>,
}

impl CatalogStore {
    /// Open (creating if missing) the dataset under `path`.
    pub fn open<P: AsRef<Path>>(path: P, limits: StorageLimits) -> ScratchResult<Self> {
        let cache = Cache::new_lru_cache(BLOCK_CACHE_BYTES);

        let mut db_opts = rocksdb::Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let descriptors = get_cf_descriptors(&cache);
        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), descriptors)
            .map_err(|_| ScratchError::config("Unable to open storage database"))?;

        Ok(Self {
            db,
            cache,
            limits,
            write_lock: Mutex::new(()),
        })
    }

    /// Scratchpad identifiers: 1-128 chars of `[A-Za-z0-9_-]`.
    pub fn validate_identifier(scratch_id: &str) -> ScratchResult<()> {
        let valid = !scratch_id.is_empty()
            && scratch_id.len() <= 128
            && scratch_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(())
        } else {
            Err(
                ScratchError::invalid_id("Scratchpad identifier contains invalid characters")
                    .with_details(serde_json::json!({ "scratch_id": scratch_id })),
            )
        }
    }

    /// Cell identifiers share the scratchpad id charset; they embed into
    /// storage keys.
    pub fn validate_cell_identifier(cell_id: &str) -> ScratchResult<()> {
        let valid = !cell_id.is_empty()
            && cell_id.len() <= 128
            && cell_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(())
        } else {
            Err(
                ScratchError::invalid_id("Cell identifier contains invalid characters")
                    .with_details(serde_json::json!({ "cell_id": cell_id })),
            )
        }
    }

    pub fn has_pad(&self, tenant: &str, scratch_id: &str) -> ScratchResult<bool> {
        Self::validate_identifier(scratch_id)?;
        Ok(self.pad_record(tenant, scratch_id)?.is_some())
    }

    /// Persist a new pad with its initial cells.
    ///
    /// Under `discard`, pads evicted to make room are deleted in the same
    /// commit and their ids returned. Duplicate ids fail with `INVALID_ID`.
    pub fn create_pad(
        &self,
        tenant: &str,
        mut pad: Scratchpad,
        embedder: &dyn PadEmbedder,
    ) -> ScratchResult<(Scratchpad, Vec<String>)> {
        Self::validate_identifier(&pad.scratch_id)?;
        let _guard = self.write_lock.lock();

        if self.pad_record(tenant, &pad.scratch_id)?.is_some() {
            return Err(ScratchError::invalid_id(format!(
                "Scratchpad {} already exists",
                pad.scratch_id
            )));
        }

        pad.normalize();
        pad.renumber();
        self.enforce_cell_limits(&pad.cells)?;

        let mut batch = WriteBatch::default();
        let evicted = self.stage_capacity_enforcement(&mut batch, tenant)?;

        let now = Utc::now();
        self.stage_pad_write(&mut batch, tenant, &pad, now, now, now, embedder)?;
        self.write(batch)?;

        debug!(tenant, scratch_id = %pad.scratch_id, "created scratchpad");
        Ok((pad, evicted))
    }

    /// Read a pad, asserting any namespace filter and advancing
    /// `last_access_at` in the same commit.
    pub fn read_pad(
        &self,
        tenant: &str,
        scratch_id: &str,
        filter: &ReadFilter,
    ) -> ScratchResult<Scratchpad> {
        Self::validate_identifier(scratch_id)?;
        let _guard = self.write_lock.lock();

        let mut record = self
            .pad_record(tenant, scratch_id)?
            .ok_or_else(|| ScratchError::not_found(format!("Scratchpad {scratch_id} not found")))?;
        let cells = self.load_cells(tenant, scratch_id)?;
        let pad = record.clone().into_pad(cells);

        check_namespace(&pad, filter)?;

        let now = Utc::now();
        record.last_access_at = record.last_access_at.max(now);
        let mut batch = WriteBatch::default();
        self.put_record(&mut batch, CF_PADS, keys::pad_key(tenant, scratch_id), &record)?;
        self.write(batch)?;

        Ok(pad)
    }

    /// Lean listing with tenant, namespace, and tag predicates applied while
    /// scanning, before the limit truncates.
    pub fn list_pads(
        &self,
        tenant: &str,
        namespaces: Option<&[String]>,
        tags: Option<&[String]>,
        limit: Option<usize>,
    ) -> ScratchResult<Vec<PadListing>> {
        let mut listings = Vec::new();
        for record in self.tenant_pad_records(tenant)? {
            if !namespace_matches(record.namespace.as_deref(), namespaces) {
                continue;
            }
            if !tags_match(&record.tags, &record.cell_tags, tags) {
                continue;
            }
            listings.push(record.to_listing());
            if let Some(limit) = limit {
                if listings.len() >= limit {
                    break;
                }
            }
        }
        if limit == Some(0) {
            listings.clear();
        }
        Ok(listings)
    }

    /// Append a cell at the end of the pad.
    pub fn append_cell(
        &self,
        tenant: &str,
        scratch_id: &str,
        mut cell: ScratchCell,
        embedder: &dyn PadEmbedder,
    ) -> ScratchResult<Scratchpad> {
        Self::validate_identifier(scratch_id)?;
        let _guard = self.write_lock.lock();

        let (record, mut pad) = self.load_pad_locked(tenant, scratch_id)?;
        Self::validate_cell_identifier(&cell.cell_id)?;
        if pad.position_of(&cell.cell_id).is_some() {
            return Err(ScratchError::invalid_id(format!(
                "Cell id {} already exists",
                cell.cell_id
            )));
        }

        self.enforce_cell_size(&cell)?;
        if self.limits.max_cells_per_pad > 0 && pad.cells.len() + 1 > self.limits.max_cells_per_pad
        {
            return Err(ScratchError::capacity("Maximum cells per scratchpad exceeded")
                .with_details(serde_json::json!({ "limit": self.limits.max_cells_per_pad })));
        }

        cell.index = pad.cells.len();
        pad.cells.push(cell);

        self.commit_pad_update(tenant, record, pad, embedder)
    }

    /// Replace the cell addressed by `cell_id`, optionally moving it to
    /// `new_index`; all other cells keep relative order and indices are
    /// renumbered to stay contiguous.
    pub fn replace_cell(
        &self,
        tenant: &str,
        scratch_id: &str,
        cell_id: &str,
        mut new_cell: ScratchCell,
        new_index: Option<usize>,
        embedder: &dyn PadEmbedder,
    ) -> ScratchResult<Scratchpad> {
        Self::validate_identifier(scratch_id)?;
        let _guard = self.write_lock.lock();

        let (record, mut pad) = self.load_pad_locked(tenant, scratch_id)?;
        let position = pad.position_of(cell_id).ok_or_else(|| {
            ScratchError::not_found(format!("Cell id {cell_id} not found"))
                .with_details(serde_json::json!({ "cell_id": cell_id }))
        })?;

        let target = new_index.unwrap_or(position);
        if target >= pad.cells.len() {
            return Err(ScratchError::invalid_index(format!(
                "Cell index {target} out of range"
            )));
        }

        self.enforce_cell_size(&new_cell)?;
        new_cell.cell_id = cell_id.to_string();
        pad.cells[position] = new_cell;

        if target != position {
            let moving = pad.cells.remove(position);
            pad.cells.insert(target, moving);
        }
        pad.renumber();

        self.commit_pad_update(tenant, record, pad, embedder)
    }

    /// Delete a pad with its cells and embeddings. Idempotent: deleting a
    /// missing pad returns `false`.
    pub fn delete_pad(&self, tenant: &str, scratch_id: &str) -> ScratchResult<bool> {
        Self::validate_identifier(scratch_id)?;
        let _guard = self.write_lock.lock();

        if self.pad_record(tenant, scratch_id)?.is_none() {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        self.stage_pad_delete(&mut batch, tenant, scratch_id)?;
        self.write(batch)?;
        debug!(tenant, scratch_id, "deleted scratchpad");
        Ok(true)
    }

    /// Aggregate scratchpad-level and cell-level tags for the tenant.
    pub fn list_tags(&self, tenant: &str, namespaces: Option<&[String]>) -> ScratchResult<TagListing> {
        let mut pad_tags = std::collections::BTreeSet::new();
        let mut cell_tags = std::collections::BTreeSet::new();
        for record in self.tenant_pad_records(tenant)? {
            if !namespace_matches(record.namespace.as_deref(), namespaces) {
                continue;
            }
            pad_tags.extend(record.tags.iter().cloned());
            cell_tags.extend(record.cell_tags.iter().cloned());
        }
        Ok(TagListing {
            scratchpad_tags: pad_tags.into_iter().collect(),
            cell_tags: cell_tags.into_iter().collect(),
            namespace_filter: namespaces.map(<[String]>::to_vec),
        })
    }

    /// Current pad and cell counts for the tenant.
    pub fn snapshot_counts(&self, tenant: &str) -> ScratchResult<(usize, usize)> {
        let mut pads = 0;
        let mut cells = 0;
        for record in self.tenant_pad_records(tenant)? {
            pads += 1;
            cells += record.cell_count;
        }
        Ok((pads, cells))
    }

    /// One-time migration run on first auth enablement: move every pad under
    /// the implicit default tenant to `target` in a single commit.
    pub fn migrate_default_tenant(&self, target: &str) -> ScratchResult<Vec<String>> {
        if target.is_empty() || target == DEFAULT_TENANT_ID {
            return Ok(Vec::new());
        }
        let _guard = self.write_lock.lock();

        let records = self.tenant_pad_records(DEFAULT_TENANT_ID)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut batch = WriteBatch::default();
        let mut migrated = Vec::new();
        for mut record in records {
            let scratch_id = record.scratch_id.clone();
            let cells = self.load_cells(DEFAULT_TENANT_ID, &scratch_id)?;
            let embeddings = self.load_embeddings(DEFAULT_TENANT_ID, &scratch_id)?;

            self.stage_pad_delete(&mut batch, DEFAULT_TENANT_ID, &scratch_id)?;

            record.tenant_id = target.to_string();
            self.put_record(&mut batch, CF_PADS, keys::pad_key(target, &scratch_id), &record)?;
            for cell in &cells {
                self.put_record(
                    &mut batch,
                    CF_CELLS,
                    keys::cell_key(target, &scratch_id, &cell.cell_id),
                    cell,
                )?;
            }
            for mut row in embeddings {
                row.tenant_id = target.to_string();
                self.put_record(
                    &mut batch,
                    CF_EMBEDDINGS,
                    keys::embedding_key(target, &scratch_id, row.cell_id.as_deref()),
                    &row,
                )?;
            }
            if let Some(namespace) = record.namespace.clone() {
                self.stage_namespace_registration(&mut batch, target, &namespace)?;
            }
            migrated.push(scratch_id);
        }
        self.write(batch)?;
        migrated.sort();
        info!(tenant = target, pad_count = migrated.len(), "tenant migration completed");
        Ok(migrated)
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    pub(crate) fn cf(&self, name: &str) -> ScratchResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ScratchError::internal("Storage column family missing"))
    }

    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> ScratchResult<Option<T>> {
        let cf = self.cf(cf_name)?;
        let raw = self
            .db
            .get_cf(cf, key)
            .map_err(|_| ScratchError::internal("Storage read failed"))?;
        match raw {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|_| ScratchError::internal("Storage row is corrupt")),
            None => Ok(None),
        }
    }

    pub(crate) fn put_record<T: serde::Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: Vec<u8>,
        value: &T,
    ) -> ScratchResult<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|_| ScratchError::internal("Storage row serialization failed"))?;
        batch.put_cf(cf, key, bytes);
        Ok(())
    }

    pub(crate) fn write(&self, batch: WriteBatch) -> ScratchResult<()> {
        let mut options = WriteOptions::default();
        options.set_sync(true);
        self.db
            .write_opt(batch, &options)
            .map_err(|_| ScratchError::internal("Storage write failed"))
    }

    /// Collect `(key, value)` pairs under a prefix.
    pub(crate) fn prefix_scan(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> ScratchResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            rocksdb::IteratorMode::From(prefix, rocksdb::Direction::Forward),
        );
        for item in iter {
            let (key, value) = item.map_err(|_| ScratchError::internal("Storage scan failed"))?;
            if !keys::has_prefix(&key, prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }
        Ok(rows)
    }

    pub(crate) fn pad_record(&self, tenant: &str, scratch_id: &str) -> ScratchResult<Option<PadRecord>> {
        self.get_record(CF_PADS, &keys::pad_key(tenant, scratch_id))
    }

    /// All pad rows for a tenant, ordered by `scratch_id`.
    pub(crate) fn tenant_pad_records(&self, tenant: &str) -> ScratchResult<Vec<PadRecord>> {
        let prefix = keys::tenant_prefix(tenant);
        let mut records = Vec::new();
        for (_, value) in self.prefix_scan(CF_PADS, &prefix)? {
            let record: PadRecord = serde_json::from_slice(&value)
                .map_err(|_| ScratchError::internal("Storage row is corrupt"))?;
            records.push(record);
        }
        Ok(records)
    }

    pub(crate) fn load_cells(&self, tenant: &str, scratch_id: &str) -> ScratchResult<Vec<ScratchCell>> {
        let prefix = keys::pad_scope_prefix(tenant, scratch_id);
        let mut cells = Vec::new();
        for (_, value) in self.prefix_scan(CF_CELLS, &prefix)? {
            let cell: ScratchCell = serde_json::from_slice(&value)
                .map_err(|_| ScratchError::internal("Storage row is corrupt"))?;
            cells.push(cell);
        }
        cells.sort_by_key(|c| c.index);
        Ok(cells)
    }

    pub(crate) fn load_embeddings(
        &self,
        tenant: &str,
        scratch_id: &str,
    ) -> ScratchResult<Vec<EmbeddingRecord>> {
        let prefix = keys::pad_scope_prefix(tenant, scratch_id);
        let mut rows = Vec::new();
        for (_, value) in self.prefix_scan(CF_EMBEDDINGS, &prefix)? {
            let row: EmbeddingRecord = serde_json::from_slice(&value)
                .map_err(|_| ScratchError::internal("Storage row is corrupt"))?;
            rows.push(row);
        }
        Ok(rows)
    }

    pub(crate) fn load_pad_locked(
        &self,
        tenant: &str,
        scratch_id: &str,
    ) -> ScratchResult<(PadRecord, Scratchpad)> {
        let record = self
            .pad_record(tenant, scratch_id)?
            .ok_or_else(|| ScratchError::not_found(format!("Scratchpad {scratch_id} not found")))?;
        let cells = self.load_cells(tenant, scratch_id)?;
        let pad = record.clone().into_pad(cells);
        Ok((record, pad))
    }

    pub(crate) fn commit_pad_update(
        &self,
        tenant: &str,
        record: PadRecord,
        mut pad: Scratchpad,
        embedder: &dyn PadEmbedder,
    ) -> ScratchResult<Scratchpad> {
        pad.normalize();
        let now = Utc::now();
        let last_access = record.last_access_at.max(now);
        let mut batch = WriteBatch::default();
        self.stage_pad_write(
            &mut batch,
            tenant,
            &pad,
            record.created_at,
            last_access,
            now,
            embedder,
        )?;
        self.write(batch)?;
        Ok(pad)
    }

    /// Stage a full pad write: row, cell rows, and embedding rows replace
    /// whatever was there, all in the caller's batch.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn stage_pad_write(
        &self,
        batch: &mut WriteBatch,
        tenant: &str,
        pad: &Scratchpad,
        created_at: DateTime<Utc>,
        last_access_at: DateTime<Utc>,
        now: DateTime<Utc>,
        embedder: &dyn PadEmbedder,
    ) -> ScratchResult<()> {
        // stale cell/embedding rows first
        let scope = keys::pad_scope_prefix(tenant, &pad.scratch_id);
        let cells_cf = self.cf(CF_CELLS)?;
        for (key, _) in self.prefix_scan(CF_CELLS, &scope)? {
            batch.delete_cf(cells_cf, key);
        }
        let embeddings_cf = self.cf(CF_EMBEDDINGS)?;
        for (key, _) in self.prefix_scan(CF_EMBEDDINGS, &scope)? {
            batch.delete_cf(embeddings_cf, key);
        }

        let record = PadRecord::from_pad(tenant, pad, created_at, last_access_at, now);
        self.put_record(batch, CF_PADS, keys::pad_key(tenant, &pad.scratch_id), &record)?;
        for cell in &pad.cells {
            self.put_record(
                batch,
                CF_CELLS,
                keys::cell_key(tenant, &pad.scratch_id, &cell.cell_id),
                cell,
            )?;
        }

        for row in embedder.embed_pad(tenant, pad)? {
            self.put_record(
                batch,
                CF_EMBEDDINGS,
                keys::embedding_key(tenant, &pad.scratch_id, row.cell_id.as_deref()),
                &row,
            )?;
        }

        if let Some(namespace) = pad.namespace() {
            self.stage_namespace_registration(batch, tenant, namespace)?;
        }
        Ok(())
    }

    /// Stage removal of a pad row plus its cell and embedding rows.
    pub(crate) fn stage_pad_delete(
        &self,
        batch: &mut WriteBatch,
        tenant: &str,
        scratch_id: &str,
    ) -> ScratchResult<()> {
        let pads_cf = self.cf(CF_PADS)?;
        batch.delete_cf(pads_cf, keys::pad_key(tenant, scratch_id));
        let scope = keys::pad_scope_prefix(tenant, scratch_id);
        let cells_cf = self.cf(CF_CELLS)?;
        for (key, _) in self.prefix_scan(CF_CELLS, &scope)? {
            batch.delete_cf(cells_cf, key);
        }
        let embeddings_cf = self.cf(CF_EMBEDDINGS)?;
        for (key, _) in self.prefix_scan(CF_EMBEDDINGS, &scope)? {
            batch.delete_cf(embeddings_cf, key);
        }
        Ok(())
    }

    pub(crate) fn stage_namespace_registration(
        &self,
        batch: &mut WriteBatch,
        tenant: &str,
        namespace: &str,
    ) -> ScratchResult<()> {
        let key = keys::namespace_key(tenant, namespace);
        let existing: Option<NamespaceRecord> = self.get_record(CF_NAMESPACES, &key)?;
        if existing.is_none() {
            let record = NamespaceRecord {
                namespace: namespace.to_string(),
                tenant_id: tenant.to_string(),
                created_at: Utc::now(),
            };
            self.put_record(batch, CF_NAMESPACES, key, &record)?;
        }
        Ok(())
    }

    pub(crate) fn enforce_cell_limits(&self, cells: &[ScratchCell]) -> ScratchResult<()> {
        if self.limits.max_cells_per_pad > 0 && cells.len() > self.limits.max_cells_per_pad {
            return Err(ScratchError::capacity("Maximum cells per scratchpad exceeded")
                .with_details(serde_json::json!({ "limit": self.limits.max_cells_per_pad })));
        }
        for cell in cells {
            Self::validate_cell_identifier(&cell.cell_id)?;
            self.enforce_cell_size(cell)?;
        }
        Ok(())
    }

    pub(crate) fn enforce_cell_size(&self, cell: &ScratchCell) -> ScratchResult<()> {
        let max = self.limits.max_cell_bytes;
        if max > 0 && cell.content_bytes() > max {
            return Err(
                ScratchError::capacity("Cell content exceeds configured byte limit").with_details(
                    serde_json::json!({ "limit": max, "size": cell.content_bytes() }),
                ),
            );
        }
        Ok(())
    }
}

pub(crate) fn namespace_matches(namespace: Option<&str>, filter: Option<&[String]>) -> bool {
    match filter {
        None => true,
        Some(allowed) if allowed.is_empty() => true,
        Some(allowed) => {
            let value = namespace.unwrap_or("");
            allowed.iter().any(|ns| ns == value)
        }
    }
}

pub(crate) fn tags_match(tags: &[String], cell_tags: &[String], filter: Option<&[String]>) -> bool {
    match filter {
        None => true,
        Some(wanted) if wanted.is_empty() => true,
        Some(wanted) => wanted
            .iter()
            .any(|tag| tags.contains(tag) || cell_tags.contains(tag)),
    }
}
