//! # Scoped Store
//!
//! Keyed registry of shared containers. Each entry is owned by the set of
//! scopes that acquired it and is evicted the moment that set empties.
//!
//! ## Lifecycle of an entry
//!
//! ```text
//! acquire_shared(k, A) ──► entry{gen 0, owners {A}} ── factory runs once
//! acquire_shared(k, B) ──► owners {A, B}            ── same container
//! A destroyed          ──► owners {B}
//! B destroyed          ──► evicted (owners empty, removed under the lock)
//! acquire_shared(k, C) ──► entry{gen 1, owners {C}} ── factory runs again
//! ```
//!
//! Owners never release explicitly; release is inferred from the scope's
//! destroy signal. Eviction removes the entry from the registry; the
//! container itself is freed once the last `Arc` handed out is dropped.

use crate::entry::StoreEntry;
use crate::error::StoreError;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use shared_types::{MetricsRecorder, NoOpMetrics, ScopeId, ScopeRef};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

lazy_static! {
    static ref GLOBAL_STORE: ScopedStore = ScopedStore::new();
}

struct StoreShared {
    entries: Mutex<HashMap<String, StoreEntry>>,
    metrics: Arc<dyn MetricsRecorder>,
    next_generation: AtomicU64,
}

impl StoreShared {
    /// Drop `scope` from the owners of `key`, evicting the entry if it was
    /// the last one. Listeners from an older generation are ignored.
    fn release_owner(&self, key: &str, generation: u64, scope: ScopeId) {
        let evicted = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            if entry.generation() != generation {
                trace!(key, generation, "Stale owner release ignored");
                return;
            }

            entry.owners.remove(&scope);
            if entry.owners.is_empty() {
                entries.remove(key)
            } else {
                debug!(
                    key,
                    scope = %scope,
                    remaining = entry.owners.len(),
                    "Owner released"
                );
                None
            }
        };

        // Dropped outside the lock: a container's destructor may use the store.
        if let Some(entry) = evicted {
            self.metrics.record_entry_evicted(key);
            debug!(
                key,
                generation = entry.generation(),
                scope = %scope,
                "Entry evicted, last owner destroyed"
            );
        }
    }
}

/// Reference-counted registry of shared containers.
///
/// Cloning a `ScopedStore` yields another handle to the same registry.
#[derive(Clone)]
pub struct ScopedStore {
    shared: Arc<StoreShared>,
}

impl ScopedStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(NoOpMetrics))
    }

    /// Create an empty store reporting to `metrics`.
    #[must_use]
    pub fn with_metrics(metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            shared: Arc::new(StoreShared {
                entries: Mutex::new(HashMap::new()),
                metrics,
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Process-wide default store.
    pub fn global() -> &'static ScopedStore {
        &GLOBAL_STORE
    }

    /// Obtain the container shared under `key`, binding `scope` as an owner.
    ///
    /// `factory` runs only when no live entry exists for `key`. Racing
    /// acquirers of an unseen key share one factory run.
    ///
    /// A scope that is already destroyed never becomes an owner: it gets
    /// the live container if there is one, otherwise a fresh container that
    /// is not stored.
    ///
    /// # Errors
    ///
    /// - `StoreError::EmptyKey` - `key` is empty
    /// - `StoreError::ContainerTypeMismatch` - the live entry holds another type
    /// - `StoreError::DuplicateFactoryInvocation` - internal invariant violated
    pub fn acquire_shared<T, F>(&self, key: &str, scope: &ScopeRef, factory: F) -> Result<Arc<T>, StoreError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        if scope.is_destroyed() {
            return self.acquire_unowned(key, scope, factory);
        }

        let scope_id = scope.id();
        let (slot, created_entry, newly_owned) = {
            let mut entries = self.shared.entries.lock();
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.check_type::<T>(key)?;
                    let newly_owned = entry.owners.insert(scope_id);
                    (Arc::clone(&entry.slot), false, newly_owned)
                }
                None => {
                    let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
                    let entry = StoreEntry::new::<T>(key, generation, scope_id);
                    let slot = Arc::clone(&entry.slot);
                    entries.insert(key.to_string(), entry);
                    (slot, true, true)
                }
            }
        };

        if created_entry {
            self.shared.metrics.record_entry_created(key);
            debug!(key, generation = slot.generation(), scope = %scope_id, "Entry created");
        }

        // Registered after the lock is released: an already-fired signal runs
        // the handler inline, and the handler takes the lock.
        if newly_owned {
            self.bind_owner(key, slot.generation(), scope);
            if !created_entry {
                debug!(key, scope = %scope_id, "Owner added");
            }
        }

        let (container, ran_factory) = slot.get_or_create(factory)?;
        if ran_factory {
            trace!(key, generation = slot.generation(), "Container initialised");
        }
        Ok(container)
    }

    /// Whether a live entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.shared.entries.lock().contains_key(key)
    }

    /// Number of scopes owning `key`, zero if there is no entry.
    #[must_use]
    pub fn owner_count(&self, key: &str) -> usize {
        self.shared
            .entries
            .lock()
            .get(key)
            .map_or(0, |entry| entry.owners.len())
    }

    /// Whether `scope` currently owns `key`.
    #[must_use]
    pub fn is_owner(&self, key: &str, scope: ScopeId) -> bool {
        self.shared
            .entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.owners.contains(&scope))
    }

    /// Generation of the live entry for `key`.
    #[must_use]
    pub fn generation(&self, key: &str) -> Option<u64> {
        self.shared.entries.lock().get(key).map(StoreEntry::generation)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of all live entries, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn acquire_unowned<T, F>(&self, key: &str, scope: &ScopeRef, factory: F) -> Result<Arc<T>, StoreError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        warn!(
            key,
            scope = %scope.id(),
            kind = scope.kind(),
            "Acquire from destroyed scope, container not retained"
        );

        let existing = {
            let entries = self.shared.entries.lock();
            match entries.get(key) {
                Some(entry) => {
                    entry.check_type::<T>(key)?;
                    Some(Arc::clone(&entry.slot))
                }
                None => None,
            }
        };

        match existing {
            Some(slot) => slot.get_or_create(factory).map(|(container, _)| container),
            None => Ok(Arc::new(factory())),
        }
    }

    fn bind_owner(&self, key: &str, generation: u64, scope: &ScopeRef) {
        let weak_store = Arc::downgrade(&self.shared);
        let key = key.to_string();
        scope.on_destroy(Box::new(move |scope_id| {
            if let Some(shared) = weak_store.upgrade() {
                shared.release_owner(&key, generation, scope_id);
            }
        }));
    }
}

impl Default for ScopedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStore")
            .field("entries", &self.len())
            .finish()
    }
}
