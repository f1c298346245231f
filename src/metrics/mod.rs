// Private module declaration
mod server;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

pub use server::{start_http_server, AppState};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Change feed traffic and subscription attempts
// - Notification fan-out per surface
// - Telegram relay outcomes
// - Telegram circuit breaker state
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Change feed
    pub realtime_changes: IntCounterVec,
    pub realtime_subscriptions: IntCounterVec,
    pub realtime_retries: IntCounter,

    // Fan-out
    pub notifications_dispatched: IntCounterVec,
    pub telegram_messages: IntCounterVec,

    // Circuit Breaker
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let realtime_changes = IntCounterVec::new(
            Opts::new("realtime_changes_total", "Order change events received from the feed"),
            &["kind"],
        )?;
        registry.register(Box::new(realtime_changes.clone()))?;

        let realtime_subscriptions = IntCounterVec::new(
            Opts::new("realtime_subscriptions_total", "Change feed subscription attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(realtime_subscriptions.clone()))?;

        let realtime_retries = IntCounter::new(
            "realtime_subscription_retries_total",
            "Retry timers scheduled after a failed subscription",
        )?;
        registry.register(Box::new(realtime_retries.clone()))?;

        let notifications_dispatched = IntCounterVec::new(
            Opts::new("notifications_dispatched_total", "In-app notifications delivered per surface"),
            &["surface"],
        )?;
        registry.register(Box::new(notifications_dispatched.clone()))?;

        let telegram_messages = IntCounterVec::new(
            Opts::new("telegram_messages_total", "Telegram relay outcomes"),
            &["outcome"],
        )?;
        registry.register(Box::new(telegram_messages.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Telegram circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            realtime_changes,
            realtime_subscriptions,
            realtime_retries,
            notifications_dispatched,
            telegram_messages,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_change(&self, kind: &str) {
        self.realtime_changes.with_label_values(&[kind]).inc();
    }

    pub fn record_subscription(&self, outcome: &str) {
        self.realtime_subscriptions.with_label_values(&[outcome]).inc();
    }

    pub fn record_retry_scheduled(&self) {
        self.realtime_retries.inc();
    }

    pub fn record_dispatch(&self, surface: &str) {
        self.notifications_dispatched.with_label_values(&[surface]).inc();
    }

    pub fn record_telegram(&self, outcome: &str) {
        self.telegram_messages.with_label_values(&[outcome]).inc();
    }

    pub fn update_circuit_breaker_state(&self, state: i64) {
        self.circuit_breaker_state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_change("insert");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_change_and_dispatch() {
        let metrics = Metrics::new().unwrap();
        metrics.record_change("insert");
        metrics.record_change("insert");
        metrics.record_dispatch("toast");

        assert_eq!(metrics.realtime_changes.with_label_values(&["insert"]).get(), 2);
        assert_eq!(metrics.notifications_dispatched.with_label_values(&["toast"]).get(), 1);

        let gathered = metrics.registry().gather();
        assert!(gathered.iter().any(|m| m.name() == "realtime_changes_total"));
    }

    #[test]
    fn test_retry_counter_and_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.record_retry_scheduled();
        metrics.record_retry_scheduled();
        metrics.update_circuit_breaker_state(1);

        assert_eq!(metrics.realtime_retries.get(), 2);
        assert_eq!(metrics.circuit_breaker_state.get(), 1);
    }
}
