//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_entries_applied_total` - Entries applied across all batches
//! - `ledger_apply_duration_seconds` - Histogram of `apply` latencies
//! - `ledger_insufficient_funds_total` - Batches rejected for overdraft
//! - `ledger_receipts_created_total` - Attribution receipts created
//! - `ledger_settlements_applied_total` - Settlements applied (both outcomes)

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Entries applied
    pub entries_applied: IntCounter,

    /// Apply latency histogram
    pub apply_duration: Histogram,

    /// Batches rejected with InsufficientFunds
    pub insufficient_funds: IntCounter,

    /// Receipts created
    pub receipts_created: IntCounter,

    /// Settlements applied
    pub settlements_applied: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create a new collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let entries_applied = IntCounter::with_opts(Opts::new(
            "ledger_entries_applied_total",
            "Entries applied across all batches",
        ))?;
        registry.register(Box::new(entries_applied.clone()))?;

        let apply_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_apply_duration_seconds",
                "Histogram of apply latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(apply_duration.clone()))?;

        let insufficient_funds = IntCounter::with_opts(Opts::new(
            "ledger_insufficient_funds_total",
            "Batches rejected for overdraft",
        ))?;
        registry.register(Box::new(insufficient_funds.clone()))?;

        let receipts_created = IntCounter::with_opts(Opts::new(
            "ledger_receipts_created_total",
            "Attribution receipts created",
        ))?;
        registry.register(Box::new(receipts_created.clone()))?;

        let settlements_applied = IntCounter::with_opts(Opts::new(
            "ledger_settlements_applied_total",
            "Settlements applied, both outcomes",
        ))?;
        registry.register(Box::new(settlements_applied.clone()))?;

        Ok(Self {
            entries_applied,
            apply_duration,
            insufficient_funds,
            receipts_created,
            settlements_applied,
            registry,
        })
    }

    /// Record a successful batch apply
    pub fn record_apply(&self, entry_count: usize, duration_seconds: f64) {
        self.entries_applied.inc_by(entry_count as u64);
        self.apply_duration.observe(duration_seconds);
    }

    /// Record an overdraft rejection
    pub fn record_insufficient_funds(&self) {
        self.insufficient_funds.inc();
    }

    /// Record a created receipt
    pub fn record_receipt(&self) {
        self.receipts_created.inc();
    }

    /// Record an applied settlement
    pub fn record_settlement(&self) {
        self.settlements_applied.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.entries_applied.get(), 0);
        assert_eq!(metrics.insufficient_funds.get(), 0);
    }

    #[test]
    fn test_record_apply() {
        let metrics = Metrics::new().unwrap();
        metrics.record_apply(4, 0.002);
        metrics.record_apply(1, 0.001);
        assert_eq!(metrics.entries_applied.get(), 5);
    }

    #[test]
    fn test_record_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_insufficient_funds();
        metrics.record_receipt();
        metrics.record_settlement();
        metrics.record_settlement();
        assert_eq!(metrics.insufficient_funds.get(), 1);
        assert_eq!(metrics.receipts_created.get(), 1);
        assert_eq!(metrics.settlements_applied.get(), 2);
    }
}
