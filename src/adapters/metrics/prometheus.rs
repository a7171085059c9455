//! Prometheus Metrics Registry - Sync Pipeline Observability
//!
//! Registers the pipeline metrics and renders them in the Prometheus
//! text format for the `/metrics` endpoint of the inbound HTTP server.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Centralized Prometheus metrics for the sync service.
///
/// All metrics follow the naming convention `tariff_sync_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed cycles by kind and outcome.
    pub cycles: IntCounterVec,
    /// Cycle wall time in seconds by kind.
    pub cycle_duration: HistogramVec,
    /// Rows written by the most recent snapshot replacement.
    pub snapshot_rows: IntGauge,
    /// Per-destination publish attempts by outcome.
    pub publishes: IntCounterVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounterVec::new(
            Opts::new("tariff_sync_cycles_total", "Completed sync cycles"),
            &["cycle", "outcome"],
        )?;

        let cycle_duration = HistogramVec::new(
            HistogramOpts::new(
                "tariff_sync_cycle_duration_seconds",
                "Sync cycle duration in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["cycle"],
        )?;

        let snapshot_rows = IntGauge::new(
            "tariff_sync_snapshot_rows",
            "Tariff rows written by the last snapshot replacement",
        )?;

        let publishes = IntCounterVec::new(
            Opts::new(
                "tariff_sync_publish_total",
                "Spreadsheet publish attempts per destination",
            ),
            &["outcome"],
        )?;

        // Register all metrics
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(snapshot_rows.clone()))?;
        registry.register(Box::new(publishes.clone()))?;

        Ok(Self {
            registry,
            cycles,
            cycle_duration,
            snapshot_rows,
            publishes,
        })
    }

    /// Record one finished cycle.
    pub fn observe_cycle(&self, cycle: &str, outcome: &str, seconds: f64) {
        self.cycles.with_label_values(&[cycle, outcome]).inc();
        self.cycle_duration
            .with_label_values(&[cycle])
            .observe(seconds);
    }

    /// Record one destination publish attempt.
    pub fn observe_publish(&self, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "failure" };
        self.publishes.with_label_values(&[outcome]).inc();
    }

    /// Rows written by the last replacement.
    pub fn set_snapshot_rows(&self, rows: u64) {
        self.snapshot_rows
            .set(i64::try_from(rows).unwrap_or(i64::MAX));
    }

    /// Encode all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_metrics() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.observe_cycle("full", "success", 1.2);
        metrics.observe_publish(true);
        metrics.observe_publish(false);
        metrics.set_snapshot_rows(42);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"tariff_sync_cycles_total{cycle="full",outcome="success"} 1"#));
        assert!(text.contains(r#"tariff_sync_publish_total{outcome="failure"} 1"#));
        assert!(text.contains("tariff_sync_snapshot_rows 42"));
        assert!(text.contains("tariff_sync_cycle_duration_seconds_count{cycle=\"full\"} 1"));
    }

    #[test]
    fn test_independent_registries() {
        // Each instance owns its registry, so tests never collide.
        let a = MetricsRegistry::new().unwrap();
        let b = MetricsRegistry::new().unwrap();
        a.observe_publish(true);
        assert!(!b.render().unwrap().contains(r#"outcome="success"} 1"#));
    }
}
