//! Metrics hooks for the bus and the store
//!
//! The registries report through [`MetricsRecorder`] so hosts can plug in
//! Prometheus (see `lifeline-telemetry`), plain counters, or nothing at all.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for custom metrics recording implementations
pub trait MetricsRecorder: Send + Sync {
    /// A value was published to `topic`.
    fn record_publish(&self, topic: &str);

    /// A subscriber on `topic` received a value.
    fn record_delivery(&self, topic: &str);

    /// A subscriber on `topic` could not accept the published value.
    fn record_delivery_failure(&self, topic: &str);

    /// A store entry was created for `key`.
    fn record_entry_created(&self, key: &str);

    /// The last owner of `key` went away and the entry was evicted.
    fn record_entry_evicted(&self, key: &str);
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_publish(&self, _: &str) {}
    fn record_delivery(&self, _: &str) {}
    fn record_delivery_failure(&self, _: &str) {}
    fn record_entry_created(&self, _: &str) {}
    fn record_entry_evicted(&self, _: &str) {}
}

/// In-process counters.
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
    /// Total publishes
    pub publishes: AtomicU64,
    /// Total successful deliveries
    pub deliveries: AtomicU64,
    /// Total deliveries rejected by a subscriber
    pub delivery_failures: AtomicU64,
    /// Total store entries created
    pub entries_created: AtomicU64,
    /// Total store entries evicted
    pub entries_evicted: AtomicU64,
}

impl LifecycleMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let created = self.entries_created.load(Ordering::Relaxed);
        let evicted = self.entries_evicted.load(Ordering::Relaxed);
        MetricsSnapshot {
            publishes: self.publishes.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            entries_created: created,
            entries_evicted: evicted,
            live_entries: created.saturating_sub(evicted),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.publishes.store(0, Ordering::Relaxed);
        self.deliveries.store(0, Ordering::Relaxed);
        self.delivery_failures.store(0, Ordering::Relaxed);
        self.entries_created.store(0, Ordering::Relaxed);
        self.entries_evicted.store(0, Ordering::Relaxed);
    }
}

impl MetricsRecorder for LifecycleMetrics {
    fn record_publish(&self, _: &str) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delivery(&self, _: &str) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delivery_failure(&self, _: &str) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_entry_created(&self, _: &str) {
        self.entries_created.fetch_add(1, Ordering::Relaxed);
    }

    fn record_entry_evicted(&self, _: &str) {
        self.entries_evicted.fetch_add(1, Ordering::Relaxed);
    }
}

/// Forwards every event to each wrapped recorder, in order.
#[derive(Default)]
pub struct CompositeRecorder {
    recorders: Vec<Arc<dyn MetricsRecorder>>,
}

impl CompositeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to add a recorder
    pub fn with(mut self, recorder: Arc<dyn MetricsRecorder>) -> Self {
        self.recorders.push(recorder);
        self
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

impl MetricsRecorder for CompositeRecorder {
    fn record_publish(&self, topic: &str) {
        self.recorders.iter().for_each(|r| r.record_publish(topic));
    }

    fn record_delivery(&self, topic: &str) {
        self.recorders.iter().for_each(|r| r.record_delivery(topic));
    }

    fn record_delivery_failure(&self, topic: &str) {
        self.recorders.iter().for_each(|r| r.record_delivery_failure(topic));
    }

    fn record_entry_created(&self, key: &str) {
        self.recorders.iter().for_each(|r| r.record_entry_created(key));
    }

    fn record_entry_evicted(&self, key: &str) {
        self.recorders.iter().for_each(|r| r.record_entry_evicted(key));
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub publishes: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub entries_created: u64,
    pub entries_evicted: u64,
    pub live_entries: u64,
}
