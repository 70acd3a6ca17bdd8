//! # Event Bus
//!
//! Keyed topic registry with synchronous fan-out.
//!
//! ## Delivery Rules
//!
//! - `publish` bumps the topic's cell and offers the new version to every
//!   live subscriber in registration order.
//! - Sticky topics replay the latest value to a new subscriber before
//!   `subscribe` returns. Non-sticky topics never replay.
//! - A subscriber registered during a fan-out does not see that publish.
//! - No lock is held while callbacks run, so callbacks may publish,
//!   subscribe or unsubscribe.

use crate::cell::{VersionedCell, UNPUBLISHED};
use crate::config::BusConfig;
use crate::error::BusError;
use crate::events::{Payload, TopicKey, TopicMode};
use crate::subscriber::{
    typed_callback, DeliveryOutcome, ScopeBinding, SubscriberAdapter, SubscriptionHandle,
    SubscriptionId,
};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use shared_types::{MetricsRecorder, NoOpMetrics, ScopeRef};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

lazy_static! {
    static ref GLOBAL_BUS: EventBus = EventBus::new();
}

/// Source of per-bus identities stamped into subscription handles.
static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(0);

/// A topic: its cell and its subscribers in registration order.
struct Topic {
    cell: VersionedCell,
    subscribers: Vec<Arc<SubscriberAdapter>>,
}

impl Topic {
    fn new() -> Self {
        Self {
            cell: VersionedCell::new(),
            subscribers: Vec::new(),
        }
    }
}

struct BusShared {
    /// Topics by name and mode. Topics are never removed.
    topics: Mutex<HashMap<TopicKey, Topic>>,
    /// Process-unique; handles from other buses never match.
    bus_id: u64,
    config: BusConfig,
    metrics: Arc<dyn MetricsRecorder>,
    next_subscription: AtomicU64,
    events_published: AtomicU64,
}

impl BusShared {
    /// Look up a topic, creating it on first use.
    fn topic_entry<'a>(
        &self,
        topics: &'a mut HashMap<TopicKey, Topic>,
        name: &str,
        mode: TopicMode,
    ) -> Result<&'a mut Topic, BusError> {
        if name.is_empty() {
            return Err(BusError::EmptyTopic);
        }
        if !self.config.isolate_modes {
            let other = TopicKey::new(name, mode.opposite());
            if topics.contains_key(&other) {
                return Err(BusError::TopicModeConflict {
                    topic: name.to_string(),
                    existing: mode.opposite(),
                    requested: mode,
                });
            }
        }
        Ok(topics.entry(TopicKey::new(name, mode)).or_insert_with(|| {
            debug!(topic = name, %mode, "Topic created");
            Topic::new()
        }))
    }

    /// Detach a subscriber from its topic and mark it inactive.
    fn remove_subscriber(&self, key: &TopicKey, id: SubscriptionId) -> Option<Arc<SubscriberAdapter>> {
        let removed = {
            let mut topics = self.topics.lock();
            let topic = topics.get_mut(key)?;
            let index = topic.subscribers.iter().position(|s| s.id() == id)?;
            topic.subscribers.remove(index)
        };
        removed.deactivate();
        Some(removed)
    }
}

/// Outcome of one `publish` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Topic name.
    pub topic: String,
    /// Topic mode.
    pub mode: TopicMode,
    /// Version assigned to the published value.
    pub version: i64,
    /// Subscribers whose callback ran.
    pub delivered: usize,
    /// Subscribers skipped (removed mid-dispatch or already past this version).
    pub skipped: usize,
    /// Subscribers that rejected the value.
    pub failures: Vec<DeliveryFailure>,
}

impl PublishReport {
    /// True when no subscriber rejected the value.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A per-subscriber delivery error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub subscription: SubscriptionId,
    pub error: BusError,
}

/// Scope-aware publish/subscribe bus.
///
/// Cloning an `EventBus` yields another handle to the same registry.
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<BusShared>,
}

impl EventBus {
    /// Create a bus with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self::with_metrics(config, Arc::new(NoOpMetrics))
    }

    /// Create a bus reporting to `metrics`.
    #[must_use]
    pub fn with_metrics(config: BusConfig, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            shared: Arc::new(BusShared {
                topics: Mutex::new(HashMap::new()),
                bus_id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
                config,
                metrics,
                next_subscription: AtomicU64::new(0),
                events_published: AtomicU64::new(0),
            }),
        }
    }

    /// Process-wide default bus.
    pub fn global() -> &'static EventBus {
        &GLOBAL_BUS
    }

    /// Register `callback` on `topic`.
    ///
    /// Sticky topics that already hold a value deliver it to `callback`
    /// before this returns. When `scope` is given, the subscription is
    /// removed as soon as the scope is destroyed; a scope that is already
    /// destroyed yields a handle that never receives anything.
    ///
    /// # Errors
    ///
    /// - `BusError::EmptyTopic` - `topic` is empty
    /// - `BusError::TopicModeConflict` - `topic` exists under the other mode
    pub fn subscribe<T, F>(
        &self,
        topic: &str,
        mode: TopicMode,
        scope: Option<&ScopeRef>,
        callback: F,
    ) -> Result<SubscriptionHandle, BusError>
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        let key = TopicKey::new(topic, mode);
        let handle = SubscriptionHandle::new(self.shared.bus_id, key.clone(), id);

        let (adapter, replay) = {
            let mut topics = self.shared.topics.lock();
            let entry = self.shared.topic_entry(&mut topics, topic, mode)?;

            if let Some(scope) = scope.filter(|s| s.is_destroyed()) {
                debug!(
                    topic,
                    %mode,
                    scope = %scope.id(),
                    "Scope already destroyed, subscription ignored"
                );
                return Ok(handle);
            }

            let initial = match mode {
                TopicMode::Sticky => UNPUBLISHED,
                TopicMode::NonSticky => entry.cell.version(),
            };
            let adapter = Arc::new(SubscriberAdapter::new(
                id,
                typed_callback::<T, F>(topic, callback),
                initial,
            ));
            entry.subscribers.push(Arc::clone(&adapter));

            if self.shared.config.exceeds_warn_threshold(entry.subscribers.len()) {
                warn!(
                    topic,
                    %mode,
                    subscribers = entry.subscribers.len(),
                    "Topic subscriber count above threshold"
                );
            }

            let replay = match mode {
                TopicMode::Sticky => entry.cell.snapshot(),
                TopicMode::NonSticky => None,
            };
            (adapter, replay)
        };

        if let Some(scope) = scope {
            let weak_bus = Arc::downgrade(&self.shared);
            let listener_key = key.clone();
            let listener = scope.on_destroy(Box::new(move |scope_id| {
                let Some(shared) = weak_bus.upgrade() else {
                    return;
                };
                if shared.remove_subscriber(&listener_key, id).is_some() {
                    debug!(
                        topic = %listener_key.name,
                        mode = %listener_key.mode,
                        subscription = %id,
                        scope = %scope_id,
                        "Subscription removed with its scope"
                    );
                }
            }));
            adapter.bind_scope(ScopeBinding {
                scope: Arc::downgrade(scope),
                scope_id: scope.id(),
                listener,
            });
        }

        debug!(
            topic,
            %mode,
            subscription = %id,
            last_seen = adapter.last_seen_version(),
            "New subscription created"
        );

        if let Some((version, payload)) = replay {
            self.record_outcome(topic, &adapter, adapter.deliver(version, &payload));
        }

        Ok(handle)
    }

    /// Publish `value` to `topic`, creating the topic if needed.
    ///
    /// Delivery errors are isolated per subscriber and listed in the
    /// returned report; they never fail the publish.
    ///
    /// # Errors
    ///
    /// - `BusError::EmptyTopic` - `topic` is empty
    /// - `BusError::TopicModeConflict` - `topic` exists under the other mode
    pub fn publish<T>(&self, topic: &str, mode: TopicMode, value: T) -> Result<PublishReport, BusError>
    where
        T: Any + Send + Sync,
    {
        let payload = Payload::new(value);

        let (version, subscribers) = {
            let mut topics = self.shared.topics.lock();
            let entry = self.shared.topic_entry(&mut topics, topic, mode)?;
            let version = entry.cell.publish(payload.clone());
            (version, entry.subscribers.clone())
        };

        self.shared.events_published.fetch_add(1, Ordering::Relaxed);
        self.shared.metrics.record_publish(topic);

        let mut report = PublishReport {
            topic: topic.to_string(),
            mode,
            version,
            delivered: 0,
            skipped: 0,
            failures: Vec::new(),
        };

        for adapter in &subscribers {
            match self.record_outcome(topic, adapter, adapter.deliver(version, &payload)) {
                Some(Ok(())) => report.delivered += 1,
                Some(Err(error)) => report.failures.push(DeliveryFailure {
                    subscription: adapter.id(),
                    error,
                }),
                None => report.skipped += 1,
            }
        }

        debug!(
            topic,
            %mode,
            version,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Event published"
        );

        Ok(report)
    }

    /// Remove a subscription. Idempotent: returns `false` if it was already
    /// gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        if handle.bus() != self.shared.bus_id {
            debug!(
                topic = handle.topic(),
                subscription = %handle.id(),
                "Handle issued by another bus, ignored"
            );
            return false;
        }
        let Some(adapter) = self.shared.remove_subscriber(handle.key(), handle.id()) else {
            return false;
        };

        if let Some(binding) = adapter.take_binding() {
            if let Some(scope) = binding.scope.upgrade() {
                scope.remove_destroy_listener(binding.listener);
            }
        }

        debug!(
            topic = handle.topic(),
            mode = %handle.mode(),
            subscription = %handle.id(),
            "Subscription removed"
        );
        true
    }

    /// Latest value of `topic`, if it was ever published.
    ///
    /// # Errors
    ///
    /// `BusError::PayloadTypeMismatch` if the latest value is not a `T`.
    pub fn latest<T>(&self, topic: &str, mode: TopicMode) -> Result<Option<T>, BusError>
    where
        T: Any + Clone,
    {
        let topics = self.shared.topics.lock();
        let Some(payload) = topics
            .get(&TopicKey::new(topic, mode))
            .and_then(|entry| entry.cell.value())
        else {
            return Ok(None);
        };

        match payload.downcast_ref::<T>() {
            Some(value) => Ok(Some(value.clone())),
            None => Err(BusError::PayloadTypeMismatch {
                topic: topic.to_string(),
                expected: std::any::type_name::<T>(),
                actual: payload.type_name(),
            }),
        }
    }

    /// Current version of `topic`, `None` if the topic does not exist.
    #[must_use]
    pub fn version(&self, topic: &str, mode: TopicMode) -> Option<i64> {
        self.shared
            .topics
            .lock()
            .get(&TopicKey::new(topic, mode))
            .map(|entry| entry.cell.version())
    }

    /// Number of live subscribers on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str, mode: TopicMode) -> usize {
        self.shared
            .topics
            .lock()
            .get(&TopicKey::new(topic, mode))
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Number of topics ever created on this bus.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.shared.topics.lock().len()
    }

    /// Get the total number of events published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.shared.events_published.load(Ordering::Relaxed)
    }

    /// Configuration this bus was created with.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    /// Log and count one delivery outcome. `None` means skipped.
    fn record_outcome(
        &self,
        topic: &str,
        adapter: &SubscriberAdapter,
        outcome: DeliveryOutcome,
    ) -> Option<Result<(), BusError>> {
        match outcome {
            DeliveryOutcome::Delivered => {
                trace!(topic, subscription = %adapter.id(), "Delivered");
                self.shared.metrics.record_delivery(topic);
                Some(Ok(()))
            }
            DeliveryOutcome::Skipped => None,
            DeliveryOutcome::Failed(error) => {
                warn!(
                    topic,
                    subscription = %adapter.id(),
                    error = %error,
                    "Delivery failed"
                );
                self.shared.metrics.record_delivery_failure(topic);
                Some(Err(error))
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topic_count())
            .field("events_published", &self.events_published())
            .field("config", &self.shared.config)
            .finish()
    }
}
