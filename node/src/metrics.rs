//! # Prometheus Metrics
//!
//! Counts what the node did during one invocation: how many operations it
//! ran, how many reverted, how much base currency flowed into campaigns,
//! and how many campaigns closed. Dumped in the Prometheus text exposition
//! format when `--metrics` is passed.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use visa_protocol::Amount;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Operations submitted, labelled by operation name.
    pub operations_total: IntCounterVec,
    /// Operations that reverted, labelled by operation name.
    pub operations_failed_total: IntCounterVec,
    /// Base currency accepted by successful contributions, in wei. Held as
    /// a float, so very large totals lose their low digits.
    pub contributed_wei_total: Gauge,
    /// Campaigns that were finalized and paid out.
    pub campaigns_finalized_total: IntCounter,
}

impl LedgerMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("visa".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Total number of ledger operations submitted"),
            &["operation"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operations_failed_total = IntCounterVec::new(
            Opts::new(
                "operations_failed_total",
                "Total number of ledger operations that reverted",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(operations_failed_total.clone()))?;

        let contributed_wei_total = Gauge::new(
            "contributed_wei_total",
            "Base currency accepted by successful contributions, in wei",
        )?;
        registry.register(Box::new(contributed_wei_total.clone()))?;

        let campaigns_finalized_total = IntCounter::new(
            "campaigns_finalized_total",
            "Total number of campaigns finalized and paid out",
        )?;
        registry.register(Box::new(campaigns_finalized_total.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            operations_failed_total,
            contributed_wei_total,
            campaigns_finalized_total,
        })
    }

    /// Records the outcome of one operation.
    pub fn observe<T, E>(&self, operation: &str, result: &Result<T, E>) {
        self.operations_total.with_label_values(&[operation]).inc();
        if result.is_err() {
            self.operations_failed_total
                .with_label_values(&[operation])
                .inc();
        }
    }

    /// Adds an accepted contribution.
    pub fn record_contribution(&self, value: Amount) {
        self.contributed_wei_total.add(value as f64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
