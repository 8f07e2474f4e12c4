// Private module declaration
mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

// Re-export for public API
pub use server::configure;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers:
// - Quotes computed and rejected
// - Orders placed
// - Payment webhooks by outcome and payment/order links by source
// - Shipments booked and tracking sweep outcomes
// - Background sweep duration
// - Carrier circuit breaker state
//
// Scraped from GET /metrics on the main HTTP server.
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Pricing
    pub quotes_total: IntCounterVec,

    // Orders
    pub orders_placed_total: IntCounter,

    // Payments
    pub webhooks_total: IntCounterVec,
    pub payment_links_total: IntCounterVec,

    // Shipments
    pub shipments_total: IntCounterVec,
    pub tracking_checks_total: IntCounterVec,
    pub sweep_duration: HistogramVec,

    // Carrier
    pub carrier_circuit_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let quotes_total = IntCounterVec::new(
            Opts::new("quotes_total", "Price quotes by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(quotes_total.clone()))?;

        let orders_placed_total = IntCounter::new("orders_placed_total", "Orders placed")?;
        registry.register(Box::new(orders_placed_total.clone()))?;

        let webhooks_total = IntCounterVec::new(
            Opts::new("payment_webhooks_total", "Payment webhooks by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(webhooks_total.clone()))?;

        let payment_links_total = IntCounterVec::new(
            Opts::new("payment_links_total", "Payments linked to orders, by trigger"),
            &["source"],
        )?;
        registry.register(Box::new(payment_links_total.clone()))?;

        let shipments_total = IntCounterVec::new(
            Opts::new("shipments_total", "Carrier shipment bookings by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(shipments_total.clone()))?;

        let tracking_checks_total = IntCounterVec::new(
            Opts::new("tracking_checks_total", "Per-order tracking poll outcomes"),
            &["outcome"],
        )?;
        registry.register(Box::new(tracking_checks_total.clone()))?;

        let sweep_duration = HistogramVec::new(
            HistogramOpts::new("sweep_duration_seconds", "Background sweep duration")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["sweep"],
        )?;
        registry.register(Box::new(sweep_duration.clone()))?;

        let carrier_circuit_state = IntGauge::new(
            "carrier_circuit_state",
            "Carrier circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(carrier_circuit_state.clone()))?;

        Ok(Self {
            registry,
            quotes_total,
            orders_placed_total,
            webhooks_total,
            payment_links_total,
            shipments_total,
            tracking_checks_total,
            sweep_duration,
            carrier_circuit_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_quote(&self, outcome: &str) {
        self.quotes_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_webhook(&self, outcome: &str) {
        self.webhooks_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_payment_link(&self, source: &str) {
        self.payment_links_total.with_label_values(&[source]).inc();
    }

    pub fn record_shipment(&self, success: bool) {
        let outcome = if success { "created" } else { "failed" };
        self.shipments_total.with_label_values(&[outcome]).inc();
    }

    /// Add one sweep's per-order counts
    pub fn record_tracking_sweep(&self, updated: usize, unchanged: usize, failed: usize) {
        for (outcome, count) in [("updated", updated), ("unchanged", unchanged), ("failed", failed)] {
            self.tracking_checks_total
                .with_label_values(&[outcome])
                .inc_by(count as u64);
        }
    }

    pub fn observe_sweep(&self, sweep: &str, duration_secs: f64) {
        self.sweep_duration.with_label_values(&[sweep]).observe(duration_secs);
    }

    pub fn update_carrier_circuit_state(&self, state: i64) {
        self.carrier_circuit_state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(metrics: &Metrics, name: &str, label: &str) -> Option<f64> {
        metrics
            .registry
            .gather()
            .iter()
            .find(|m| m.name() == name)?
            .metric
            .iter()
            .find(|m| m.label.iter().any(|l| l.value() == label))?
            .counter
            .value
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_placed_total.inc();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_tracking_sweep() {
        let metrics = Metrics::new().unwrap();
        metrics.record_tracking_sweep(2, 5, 1);
        metrics.record_tracking_sweep(1, 0, 0);

        assert_eq!(counter(&metrics, "tracking_checks_total", "updated"), Some(3.0));
        assert_eq!(counter(&metrics, "tracking_checks_total", "unchanged"), Some(5.0));
        assert_eq!(counter(&metrics, "tracking_checks_total", "failed"), Some(1.0));
    }

    #[test]
    fn test_record_webhook_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_webhook("applied");
        metrics.record_webhook("applied");
        metrics.record_webhook("rejected");

        assert_eq!(counter(&metrics, "payment_webhooks_total", "applied"), Some(2.0));
        assert_eq!(counter(&metrics, "payment_webhooks_total", "rejected"), Some(1.0));
    }

    #[test]
    fn test_carrier_circuit_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.update_carrier_circuit_state(1);

        let gathered = metrics.registry.gather();
        let state = gathered.iter().find(|m| m.name() == "carrier_circuit_state").unwrap();
        assert_eq!(state.metric[0].gauge.value, Some(1.0));
    }
}
