//! Prometheus metrics for the bus and the store.
//!
//! All metrics follow the naming convention: `lifeline_<registry>_<metric>`
//!
//! ## Metric Types
//!
//! - **Counter**: publishes, deliveries, failures, entries created/evicted,
//!   labelled by topic or key
//! - **Gauge**: live store entries

use lazy_static::lazy_static;
use parking_lot::Mutex;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use shared_types::MetricsRecorder;
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    static ref GLOBAL_RECORDER: Mutex<Option<Arc<PrometheusRecorder>>> = Mutex::new(None);
}

/// [`MetricsRecorder`] backed by Prometheus collectors.
#[derive(Clone)]
pub struct PrometheusRecorder {
    publishes: IntCounterVec,
    deliveries: IntCounterVec,
    delivery_failures: IntCounterVec,
    entries_created: IntCounterVec,
    entries_evicted: IntCounterVec,
    live_entries: IntGauge,
}

fn metric_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

impl PrometheusRecorder {
    /// Create the collectors and register them with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, TelemetryError> {
        let recorder = Self {
            publishes: IntCounterVec::new(
                Opts::new("lifeline_bus_publishes_total", "Values published per topic"),
                &["topic"],
            )
            .map_err(metric_err)?,
            deliveries: IntCounterVec::new(
                Opts::new("lifeline_bus_deliveries_total", "Values delivered to subscribers"),
                &["topic"],
            )
            .map_err(metric_err)?,
            delivery_failures: IntCounterVec::new(
                Opts::new(
                    "lifeline_bus_delivery_failures_total",
                    "Deliveries rejected by a subscriber",
                ),
                &["topic"],
            )
            .map_err(metric_err)?,
            entries_created: IntCounterVec::new(
                Opts::new("lifeline_store_entries_created_total", "Store entries created"),
                &["key"],
            )
            .map_err(metric_err)?,
            entries_evicted: IntCounterVec::new(
                Opts::new("lifeline_store_entries_evicted_total", "Store entries evicted"),
                &["key"],
            )
            .map_err(metric_err)?,
            live_entries: IntGauge::new("lifeline_store_live_entries", "Store entries currently live")
                .map_err(metric_err)?,
        };

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(recorder.publishes.clone()),
            Box::new(recorder.deliveries.clone()),
            Box::new(recorder.delivery_failures.clone()),
            Box::new(recorder.entries_created.clone()),
            Box::new(recorder.entries_evicted.clone()),
            Box::new(recorder.live_entries.clone()),
        ];
        for collector in collectors {
            registry.register(collector).map_err(metric_err)?;
        }

        Ok(recorder)
    }

    /// Number of currently live store entries.
    pub fn live_entries(&self) -> i64 {
        self.live_entries.get()
    }

    /// Publishes recorded for `topic`.
    pub fn publishes(&self, topic: &str) -> u64 {
        self.publishes.with_label_values(&[topic]).get()
    }

    /// Deliveries recorded for `topic`.
    pub fn deliveries(&self, topic: &str) -> u64 {
        self.deliveries.with_label_values(&[topic]).get()
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_publish(&self, topic: &str) {
        self.publishes.with_label_values(&[topic]).inc();
    }

    fn record_delivery(&self, topic: &str) {
        self.deliveries.with_label_values(&[topic]).inc();
    }

    fn record_delivery_failure(&self, topic: &str) {
        self.delivery_failures.with_label_values(&[topic]).inc();
    }

    fn record_entry_created(&self, key: &str) {
        self.entries_created.with_label_values(&[key]).inc();
        self.live_entries.inc();
    }

    fn record_entry_evicted(&self, key: &str) {
        self.entries_evicted.with_label_values(&[key]).inc();
        self.live_entries.dec();
    }
}

/// Recorder registered with the global [`REGISTRY`], created on first use.
pub fn register_metrics() -> Result<Arc<PrometheusRecorder>, TelemetryError> {
    let mut global = GLOBAL_RECORDER.lock();
    if let Some(recorder) = global.as_ref() {
        return Ok(Arc::clone(recorder));
    }
    let recorder = Arc::new(PrometheusRecorder::register(&REGISTRY)?);
    *global = Some(Arc::clone(&recorder));
    Ok(recorder)
}

/// Encode the metrics in `registry` as Prometheus text format.
pub fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).map_err(metric_err)?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Encode all global metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    encode_registry(&REGISTRY)
}
