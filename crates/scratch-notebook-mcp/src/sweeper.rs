//! Preemptive eviction sweeper.
//!
//! Under the `preempt` policy a background task wakes every
//! `preempt_interval` and deletes pads idle for longer than `preempt_age`.
//! The sweep runs on the blocking pool (RocksDB work) and the task exits on
//! the next wake-up after the shutdown gate leaves `Running`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use scratch_notebook_storage::CatalogStore;

use crate::metrics::Metrics;
use crate::shutdown::{ServerState, ShutdownGate};

const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub fn spawn_sweeper(
    store: Arc<CatalogStore>,
    metrics: Arc<Metrics>,
    gate: &ShutdownGate,
    age: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    let mut shutdown = gate.subscribe();
    let interval = interval.max(MIN_INTERVAL);

    tokio::spawn(async move {
        info!(
            age_secs = age.as_secs(),
            interval_secs = interval.as_secs(),
            "preemptive eviction sweeper started"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let store = Arc::clone(&store);
                    match tokio::task::spawn_blocking(move || store.evict_stale(age)).await {
                        Ok(Ok(evicted)) => {
                            if !evicted.is_empty() {
                                metrics.record_evictions("preempt", evicted.len());
                            }
                        }
                        Ok(Err(err)) => error!(code = %err.code, "preemptive eviction sweep failed"),
                        Err(_) => error!("preemptive eviction sweep worker failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() != ServerState::Running {
                        break;
                    }
                }
            }
        }
        info!("preemptive eviction sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scratch_notebook_core::EvictionPolicy;
    use scratch_notebook_storage::{NoopEmbedder, StorageLimits};

    fn open_store() -> (tempfile::TempDir, Arc<CatalogStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            CatalogStore::open(
                dir.path(),
                StorageLimits::unlimited(EvictionPolicy::Preempt),
            )
            .unwrap(),
        );
        (dir, store)
    }

    #[tokio::test]
    async fn sweeper_removes_stale_pads_on_tick() {
        let (_dir, store) = open_store();
        store
            .create_pad(
                "default",
                scratch_notebook_core::Scratchpad::new("stale", serde_json::Map::new()),
                &NoopEmbedder,
            )
            .unwrap();

        let gate = ShutdownGate::new();
        let metrics = Arc::new(Metrics::new().unwrap());
        // zero age: anything idle is stale at the first tick
        let handle = spawn_sweeper(
            Arc::clone(&store),
            metrics,
            &gate,
            Duration::ZERO,
            Duration::from_millis(100),
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.snapshot_counts("default").unwrap().0, 0);

        gate.drain(Duration::from_millis(10)).await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_spares_young_pads() {
        let (_dir, store) = open_store();
        store
            .create_pad(
                "default",
                scratch_notebook_core::Scratchpad::new("young", serde_json::Map::new()),
                &NoopEmbedder,
            )
            .unwrap();

        let gate = ShutdownGate::new();
        let metrics = Arc::new(Metrics::new().unwrap());
        let handle = spawn_sweeper(
            Arc::clone(&store),
            metrics,
            &gate,
            Duration::from_secs(3600),
            Duration::from_millis(100),
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(store.snapshot_counts("default").unwrap().0, 1);

        gate.drain(Duration::from_millis(10)).await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_stops_when_gate_drains() {
        let (_dir, store) = open_store();
        let gate = ShutdownGate::new();
        let metrics = Arc::new(Metrics::new().unwrap());
        let handle = spawn_sweeper(
            store,
            metrics,
            &gate,
            Duration::from_secs(3600),
            Duration::from_secs(30),
        );
        gate.drain(Duration::from_millis(10)).await;
        // the handle resolves without waiting for the 30s interval
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop on shutdown")
            .unwrap();
    }
}
