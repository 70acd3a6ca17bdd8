//! # App Container
//!
//! Owns one instance of every registry and the metrics they report to.
//!
//! ## Thread Safety
//!
//! - Bus, store and stack are cheap handles over `Arc`-shared state
//! - Cloning the container clones the handles, not the registries

use std::sync::Arc;

use shared_bus::EventBus;
use shared_store::ScopedStore;
use shared_types::{CompositeRecorder, LifecycleMetrics, LifecycleScope, MetricsRecorder, MetricsSnapshot};
use tracing::info;

use crate::container::config::RuntimeConfig;
use crate::registry::ScopeStack;

/// Bus, store and scope stack wired to shared metrics.
#[derive(Clone)]
pub struct AppContainer {
    /// Configuration the container was built with.
    pub config: RuntimeConfig,
    /// Event bus.
    pub bus: EventBus,
    /// Scoped shared-state store.
    pub store: ScopedStore,
    /// Live scopes, bottom to top.
    pub stack: ScopeStack,
    metrics: Arc<LifecycleMetrics>,
}

impl AppContainer {
    /// Build a container with in-process metrics only.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_recorder(config, None)
    }

    /// Build a container that also reports to `extra`, typically the
    /// Prometheus recorder from telemetry.
    pub fn with_recorder(config: RuntimeConfig, extra: Option<Arc<dyn MetricsRecorder>>) -> Self {
        let metrics = Arc::new(LifecycleMetrics::new());
        let mut recorder = CompositeRecorder::new().with(metrics.clone());
        if let Some(extra) = extra {
            recorder = recorder.with(extra);
        }
        let recorder: Arc<dyn MetricsRecorder> = Arc::new(recorder);

        info!(
            isolate_modes = config.bus.isolate_modes,
            subscriber_warn_threshold = config.bus.subscriber_warn_threshold,
            "Creating app container"
        );

        Self {
            bus: EventBus::with_metrics(config.bus.clone(), Arc::clone(&recorder)),
            store: ScopedStore::with_metrics(recorder),
            stack: ScopeStack::new(),
            config,
            metrics,
        }
    }

    /// Create a scope of `kind` and push it on the stack.
    pub fn open_scope(&self, kind: &str) -> Arc<LifecycleScope> {
        let scope = LifecycleScope::shared(kind);
        self.stack.push(Arc::clone(&scope));
        scope
    }

    /// Counters accumulated since the container was built.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Destroy every open scope.
    pub fn shutdown(&self) -> usize {
        let finished = self.stack.finish_all();
        info!(finished, live_entries = self.store.len(), "App container shut down");
        finished
    }
}

impl Default for AppContainer {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
