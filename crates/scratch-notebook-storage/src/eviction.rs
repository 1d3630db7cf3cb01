//! Capacity enforcement and eviction.
//!
//! `discard` selects victims by ascending `last_access_at` (ties by
//! ascending `created_at`) inside the same commit that creates the new pad.
//! `fail` rejects the create. `preempt` leaves creation alone; the sweeper
//! calls `evict_stale` on its interval instead.

use chrono::Utc;
use rocksdb::WriteBatch;
use tracing::info;

use scratch_notebook_core::{EvictionPolicy, ScratchError, ScratchResult};

use super::store::CatalogStore;

impl CatalogStore {
    /// Applied inside `create_pad`'s transaction, before the new pad row is
    /// staged. Returns the evicted ids under `discard`.
    pub(crate) fn stage_capacity_enforcement(
        &self,
        batch: &mut WriteBatch,
        tenant: &str,
    ) -> ScratchResult<Vec<String>> {
        let max = self.limits.max_scratchpads;
        if max == 0 || self.limits.eviction_policy == EvictionPolicy::Preempt {
            return Ok(Vec::new());
        }

        let count = self.tenant_pad_records(tenant)?.len();
        if count < max {
            return Ok(Vec::new());
        }

        match self.limits.eviction_policy {
            EvictionPolicy::Fail => {
                Err(ScratchError::capacity("Maximum scratchpad capacity reached"))
            }
            EvictionPolicy::Discard => {
                let victims = self.select_eviction_candidates(tenant, count - max + 1)?;
                if victims.is_empty() {
                    return Err(ScratchError::capacity("Maximum scratchpad capacity reached"));
                }
                for scratch_id in &victims {
                    self.stage_pad_delete(batch, tenant, scratch_id)?;
                }
                info!(
                    tenant,
                    policy = "discard",
                    scratchpad_ids = ?victims,
                    "evicting scratchpads at capacity"
                );
                Ok(victims)
            }
            EvictionPolicy::Preempt => unreachable!("handled above"),
        }
    }

    /// LRU victim selection: ascending `last_access_at`, ties broken by
    /// ascending `created_at`, then `scratch_id` for determinism.
    pub(crate) fn select_eviction_candidates(
        &self,
        tenant: &str,
        count: usize,
    ) -> ScratchResult<Vec<String>> {
        let mut candidates: Vec<_> = self
            .tenant_pad_records(tenant)?
            .into_iter()
            .map(|r| (r.last_access_at, r.created_at, r.scratch_id))
            .collect();
        candidates.sort();
        Ok(candidates
            .into_iter()
            .take(count)
            .map(|(_, _, scratch_id)| scratch_id)
            .collect())
    }

    /// Delete every pad (across tenants) whose idle time exceeds `age`.
    /// Deletions are committed per tenant so no lock spans tenants.
    pub fn evict_stale(&self, age: std::time::Duration) -> ScratchResult<Vec<String>> {
        let threshold = Utc::now()
            - chrono::Duration::from_std(age)
                .map_err(|_| ScratchError::config("preempt_age is out of range"))?;

        let mut by_tenant: std::collections::BTreeMap<String, Vec<String>> = Default::default();
        {
            let prefix: Vec<u8> = Vec::new();
            for (_, value) in self.prefix_scan(crate::column_families::CF_PADS, &prefix)? {
                let record: crate::records::PadRecord = serde_json::from_slice(&value)
                    .map_err(|_| ScratchError::internal("Storage row is corrupt"))?;
                if record.last_access_at < threshold {
                    by_tenant
                        .entry(record.tenant_id.clone())
                        .or_default()
                        .push(record.scratch_id);
                }
            }
        }

        let mut evicted = Vec::new();
        for (tenant, victims) in by_tenant {
            let _guard = self.write_lock.lock();
            let mut batch = WriteBatch::default();
            let mut committed = Vec::new();
            for scratch_id in victims {
                // re-check under the lock: the pad may have been touched or
                // deleted since the scan
                match self.pad_record(&tenant, &scratch_id)? {
                    Some(record) if record.last_access_at < threshold => {
                        self.stage_pad_delete(&mut batch, &tenant, &scratch_id)?;
                        committed.push(scratch_id);
                    }
                    _ => {}
                }
            }
            if !committed.is_empty() {
                self.write(batch)?;
                info!(
                    tenant = %tenant,
                    policy = "preempt",
                    scratchpad_ids = ?committed,
                    "preemptive eviction sweep removed scratchpads"
                );
                evicted.extend(committed);
            }
        }
        Ok(evicted)
    }
}
