//! # Subscriber Adapter
//!
//! Wraps a caller's callback so replay suppression and scope-bound removal
//! can be layered on without touching the callback itself.
//!
//! ## Version Alignment
//!
//! Every adapter tracks `last_seen_version`. A value with version `v` is
//! delivered only if `last_seen_version < v`, and `last_seen_version` is
//! moved to `v` *before* the callback runs. Consequences:
//!
//! - a callback never sees the same version twice, even if it re-enters the
//!   bus and triggers a nested publish;
//! - a non-sticky subscriber starts aligned with the topic's current
//!   version, so nothing published before it subscribed is replayed.

use crate::error::BusError;
use crate::events::{Payload, TopicKey, TopicMode};
use parking_lot::Mutex;
use shared_types::{ListenerId, ScopeId, WeakScopeRef};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Type-erased callback. Fails only when the payload has the wrong type.
pub(crate) type ErasedCallback = Arc<dyn Fn(&Payload) -> Result<(), BusError> + Send + Sync>;

/// Wrap a typed callback, checking the payload type at delivery time.
pub(crate) fn typed_callback<T, F>(topic: &str, callback: F) -> ErasedCallback
where
    T: Any + Send + Sync,
    F: Fn(&T) + Send + Sync + 'static,
{
    let topic = topic.to_string();
    Arc::new(move |payload: &Payload| match payload.downcast_ref::<T>() {
        Some(value) => {
            callback(value);
            Ok(())
        }
        None => Err(BusError::PayloadTypeMismatch {
            topic: topic.clone(),
            expected: std::any::type_name::<T>(),
            actual: payload.type_name(),
        }),
    })
}

/// Identifies one subscription on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Handle returned by `subscribe`, used for explicit removal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    bus: u64,
    key: TopicKey,
    id: SubscriptionId,
}

impl SubscriptionHandle {
    pub(crate) fn new(bus: u64, key: TopicKey, id: SubscriptionId) -> Self {
        Self { bus, key, id }
    }

    /// Topic name this subscription listens on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.key.name
    }

    /// Mode the subscription was made under.
    #[must_use]
    pub fn mode(&self) -> TopicMode {
        self.key.mode
    }

    /// Subscription identity.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn bus(&self) -> u64 {
        self.bus
    }

    pub(crate) fn key(&self) -> &TopicKey {
        &self.key
    }
}

/// Link between an adapter and the scope that bounds it.
pub(crate) struct ScopeBinding {
    pub(crate) scope: WeakScopeRef,
    pub(crate) scope_id: ScopeId,
    pub(crate) listener: ListenerId,
}

/// Result of offering one version to one adapter.
#[derive(Debug)]
pub(crate) enum DeliveryOutcome {
    /// The callback ran.
    Delivered,
    /// Removed, or this version (or a newer one) was already seen.
    Skipped,
    /// The callback rejected the payload.
    Failed(BusError),
}

/// Callback plus replay bookkeeping.
pub struct SubscriberAdapter {
    id: SubscriptionId,
    callback: ErasedCallback,
    last_seen_version: AtomicI64,
    active: AtomicBool,
    binding: Mutex<Option<ScopeBinding>>,
}

impl SubscriberAdapter {
    pub(crate) fn new(id: SubscriptionId, callback: ErasedCallback, last_seen_version: i64) -> Self {
        Self {
            id,
            callback,
            last_seen_version: AtomicI64::new(last_seen_version),
            active: AtomicBool::new(true),
            binding: Mutex::new(None),
        }
    }

    /// Subscription identity.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Highest version handed to the callback so far.
    #[must_use]
    pub fn last_seen_version(&self) -> i64 {
        self.last_seen_version.load(Ordering::Acquire)
    }

    /// Whether the adapter is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Scope this adapter is bound to, if any.
    #[must_use]
    pub fn bound_scope(&self) -> Option<ScopeId> {
        self.binding.lock().as_ref().map(|binding| binding.scope_id)
    }

    /// Claim `version` for delivery. Succeeds only if it is newer than
    /// anything seen so far.
    pub(crate) fn advance_to(&self, version: i64) -> bool {
        self.last_seen_version
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |seen| {
                (seen < version).then_some(version)
            })
            .is_ok()
    }

    /// Offer `payload` at `version` to the callback.
    pub(crate) fn deliver(&self, version: i64, payload: &Payload) -> DeliveryOutcome {
        if !self.is_active() || !self.advance_to(version) {
            return DeliveryOutcome::Skipped;
        }
        match (self.callback)(payload) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(error) => DeliveryOutcome::Failed(error),
        }
    }

    /// Mark the adapter removed. Returns `false` if it already was.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn bind_scope(&self, binding: ScopeBinding) {
        *self.binding.lock() = Some(binding);
    }

    pub(crate) fn take_binding(&self) -> Option<ScopeBinding> {
        self.binding.lock().take()
    }
}

impl fmt::Debug for SubscriberAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberAdapter")
            .field("id", &self.id)
            .field("last_seen_version", &self.last_seen_version())
            .field("active", &self.is_active())
            .field("bound_scope", &self.bound_scope())
            .finish()
    }
}
