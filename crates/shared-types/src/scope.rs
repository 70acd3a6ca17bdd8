//! # Scopes and the Destroy Signal
//!
//! A scope is any externally owned context (a screen, a dialog, a worker)
//! that registries can bind to. The only thing the bus and the store need
//! from a scope is an identity and a way to learn, exactly once, that it has
//! been destroyed.
//!
//! ## Ownership
//!
//! Registries never own a scope. They keep a [`ScopeId`] or a
//! [`WeakScopeRef`] and register a handler on the scope's destroy signal.
//! The scope's external owner decides when [`LifecycleScope::destroy`] runs.
//!
//! ## Signal Semantics
//!
//! - Handlers fire exactly once, in registration order.
//! - Handlers registered after the signal fired run immediately.
//! - The handler list is dropped once fired, so firing twice is a no-op.
//! - No lock is held while handlers run; a handler may touch the registry
//!   that registered it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};
use uuid::Uuid;

/// Opaque identity of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(Uuid);

impl ScopeId {
    /// Allocate a fresh, random scope identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Identifies a handler registered on a [`DestroySignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One-shot handler invoked with the id of the scope being destroyed.
pub type DestroyHandler = Box<dyn FnOnce(ScopeId) + Send + 'static>;

/// Contract a host context must satisfy to be bound to the bus or the store.
pub trait Scope: Send + Sync {
    /// Stable identity of this scope.
    fn id(&self) -> ScopeId;

    /// Free-form label (screen type, component name). Used for logs and for
    /// bulk operations on a scope stack.
    fn kind(&self) -> &str;

    /// Whether the destroy signal has fired.
    fn is_destroyed(&self) -> bool;

    /// Register a one-shot destroy handler.
    ///
    /// If the scope is already destroyed the handler runs before this
    /// returns.
    fn on_destroy(&self, handler: DestroyHandler) -> ListenerId;

    /// Detach a handler that has not fired yet. Returns `false` if the
    /// handler is unknown or already ran.
    fn remove_destroy_listener(&self, listener: ListenerId) -> bool;
}

/// Shared handle to a scope as seen by registries.
pub type ScopeRef = Arc<dyn Scope>;

/// Non-owning handle to a scope.
pub type WeakScopeRef = Weak<dyn Scope>;

enum SignalState {
    Armed(Vec<(ListenerId, DestroyHandler)>),
    Fired,
}

/// One-shot destroy signal that binds registries to a scope.
pub struct DestroySignal {
    scope: ScopeId,
    state: Mutex<SignalState>,
    next_listener: AtomicU64,
}

impl DestroySignal {
    /// Create an armed signal for `scope`.
    #[must_use]
    pub fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            state: Mutex::new(SignalState::Armed(Vec::new())),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Register a handler. Runs it immediately if the signal already fired.
    pub fn register(&self, handler: DestroyHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));

        let mut state = self.state.lock();
        match &mut *state {
            SignalState::Armed(handlers) => {
                handlers.push((id, handler));
                trace!(scope = %self.scope, listener = id.0, "Destroy listener registered");
                return id;
            }
            SignalState::Fired => {}
        }
        drop(state);

        trace!(scope = %self.scope, "Scope already destroyed, running listener now");
        handler(self.scope);
        id
    }

    /// Detach a pending handler.
    pub fn remove(&self, listener: ListenerId) -> bool {
        let removed = {
            let mut state = self.state.lock();
            let SignalState::Armed(handlers) = &mut *state else {
                return false;
            };
            match handlers.iter().position(|(id, _)| *id == listener) {
                Some(index) => handlers.remove(index),
                None => return false,
            }
        };
        // Dropped with the lock released: captured state may call back into
        // this signal.
        drop(removed);
        true
    }

    /// Fire the signal. Returns `false` if it had already fired.
    pub fn fire(&self) -> bool {
        let handlers = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, SignalState::Fired) {
                SignalState::Armed(handlers) => handlers,
                SignalState::Fired => return false,
            }
        };

        debug!(
            scope = %self.scope,
            listeners = handlers.len(),
            "Destroy signal fired"
        );

        for (_, handler) in handlers {
            handler(self.scope);
        }
        true
    }

    /// Whether [`fire`](Self::fire) has run.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        matches!(*self.state.lock(), SignalState::Fired)
    }

    /// Number of handlers still waiting for the signal.
    #[must_use]
    pub fn pending_listeners(&self) -> usize {
        match &*self.state.lock() {
            SignalState::Armed(handlers) => handlers.len(),
            SignalState::Fired => 0,
        }
    }
}

impl fmt::Debug for DestroySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroySignal")
            .field("scope", &self.scope)
            .field("fired", &self.is_fired())
            .field("pending_listeners", &self.pending_listeners())
            .finish()
    }
}

/// Ready-made scope for hosts without their own lifetime notion.
///
/// The owner calls [`destroy`](Self::destroy) exactly when the component it
/// represents goes away; extra calls are ignored.
#[derive(Debug)]
pub struct LifecycleScope {
    id: ScopeId,
    kind: String,
    signal: DestroySignal,
}

impl LifecycleScope {
    /// Create a new live scope.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        let id = ScopeId::new();
        Self {
            id,
            kind: kind.into(),
            signal: DestroySignal::new(id),
        }
    }

    /// Create a new live scope behind an `Arc`, ready to hand to registries.
    #[must_use]
    pub fn shared(kind: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(kind))
    }

    /// Destroy the scope, firing every registered handler.
    ///
    /// Returns `false` if the scope was already destroyed.
    pub fn destroy(&self) -> bool {
        let fired = self.signal.fire();
        if fired {
            debug!(scope = %self.id, kind = %self.kind, "Scope destroyed");
        }
        fired
    }

    /// Handlers still pending on this scope.
    #[must_use]
    pub fn pending_listeners(&self) -> usize {
        self.signal.pending_listeners()
    }
}

impl Scope for LifecycleScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn is_destroyed(&self) -> bool {
        self.signal.is_fired()
    }

    fn on_destroy(&self, handler: DestroyHandler) -> ListenerId {
        self.signal.register(handler)
    }

    fn remove_destroy_listener(&self, listener: ListenerId) -> bool {
        self.signal.remove(listener)
    }
}
