//! Prometheus metrics.
//!
//! Counters track operations, errors by code, and evictions by policy;
//! gauges reflect the active tenant's pad/cell counts refreshed from a
//! storage snapshot at scrape time.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use scratch_notebook_core::{ScratchError, ScratchResult};

pub struct Metrics {
    registry: Registry,
    operations: IntCounterVec,
    errors: IntCounterVec,
    evictions: IntCounterVec,
    scratchpads_current: IntGauge,
    cells_current: IntGauge,
}

impl Metrics {
    pub fn new() -> ScratchResult<Self> {
        let registry = Registry::new();

        let operations = IntCounterVec::new(
            Opts::new(
                "scratch_notebook_operations_total",
                "Completed tool operations by name",
            ),
            &["operation"],
        )
        .map_err(|_| ScratchError::internal("Metrics registration failed"))?;
        let errors = IntCounterVec::new(
            Opts::new(
                "scratch_notebook_errors_total",
                "Tool errors by stable error code",
            ),
            &["code"],
        )
        .map_err(|_| ScratchError::internal("Metrics registration failed"))?;
        let evictions = IntCounterVec::new(
            Opts::new(
                "scratch_notebook_evictions_total",
                "Evicted scratchpads by policy",
            ),
            &["policy"],
        )
        .map_err(|_| ScratchError::internal("Metrics registration failed"))?;
        let scratchpads_current = IntGauge::new(
            "scratch_notebook_scratchpads_current",
            "Scratchpads currently stored for the active tenant",
        )
        .map_err(|_| ScratchError::internal("Metrics registration failed"))?;
        let cells_current = IntGauge::new(
            "scratch_notebook_cells_current",
            "Cells currently stored for the active tenant",
        )
        .map_err(|_| ScratchError::internal("Metrics registration failed"))?;

        registry
            .register(Box::new(operations.clone()))
            .and_then(|_| registry.register(Box::new(errors.clone())))
            .and_then(|_| registry.register(Box::new(evictions.clone())))
            .and_then(|_| registry.register(Box::new(scratchpads_current.clone())))
            .and_then(|_| registry.register(Box::new(cells_current.clone())))
            .map_err(|_| ScratchError::internal("Metrics registration failed"))?;

        Ok(Self {
            registry,
            operations,
            errors,
            evictions,
            scratchpads_current,
            cells_current,
        })
    }

    pub fn record_operation(&self, operation: &str) {
        self.operations.with_label_values(&[operation]).inc();
    }

    pub fn record_error(&self, code: &str) {
        self.errors.with_label_values(&[code]).inc();
    }

    pub fn record_evictions(&self, policy: &str, count: usize) {
        self.evictions
            .with_label_values(&[policy])
            .inc_by(count as u64);
    }

    pub fn set_current_counts(&self, scratchpads: usize, cells: usize) {
        self.scratchpads_current.set(scratchpads as i64);
        self.cells_current.set(cells as i64);
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_in_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("create");
        metrics.record_operation("create");
        metrics.record_error("NOT_FOUND");
        metrics.record_evictions("discard", 3);
        metrics.set_current_counts(5, 12);

        let body = metrics.render();
        assert!(body.contains("scratch_notebook_operations_total{operation=\"create\"} 2"));
        assert!(body.contains("scratch_notebook_errors_total{code=\"NOT_FOUND\"} 1"));
        assert!(body.contains("scratch_notebook_evictions_total{policy=\"discard\"} 3"));
        assert!(body.contains("scratch_notebook_scratchpads_current 5"));
        assert!(body.contains("scratch_notebook_cells_current 12"));
    }
}
