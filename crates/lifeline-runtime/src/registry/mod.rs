//! # Scope Stack
//!
//! Ordered registry of live scopes, bottom to top in push order.
//!
//! ```text
//! ┌─────────────────────────────┐
//! │ top    detail   (live)      │ ◄── top()
//! │        list     (live)      │
//! │ bottom home     (live)      │
//! └─────────────────────────────┘
//!     finish(["list"]) ─► list.destroy()
//!                           ├─► bus subscriptions bound to list removed
//!                           └─► store ownership released (evict if last)
//! ```
//!
//! A pushed scope leaves the stack on its own when it is destroyed, whoever
//! destroys it. Finishing a scope removes it first and destroys it after the
//! stack lock is released, so destroy handlers may use the stack.

use parking_lot::Mutex;
use shared_types::{LifecycleScope, ListenerId, Scope, ScopeId};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

struct StackItem {
    scope: Arc<LifecycleScope>,
    listener: ListenerId,
}

#[derive(Default)]
struct StackShared {
    items: Mutex<Vec<StackItem>>,
}

impl StackShared {
    fn remove_by_id(&self, id: ScopeId) -> Option<StackItem> {
        let mut items = self.items.lock();
        let index = items.iter().position(|item| item.scope.id() == id)?;
        Some(items.remove(index))
    }

    /// Take every item matching `predicate` off the stack, keeping the order
    /// of the rest.
    fn drain_matching(&self, predicate: impl Fn(&LifecycleScope) -> bool) -> Vec<Arc<LifecycleScope>> {
        let mut items = self.items.lock();
        let mut taken = Vec::new();
        items.retain(|item| {
            if predicate(&item.scope) {
                taken.push(Arc::clone(&item.scope));
                false
            } else {
                true
            }
        });
        taken
    }
}

/// Ordered registry of live [`LifecycleScope`]s.
///
/// Cloning a `ScopeStack` yields another handle to the same stack.
#[derive(Clone, Default)]
pub struct ScopeStack {
    shared: Arc<StackShared>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `scope` on top of the stack.
    ///
    /// Returns `false` if the scope is already destroyed or already on the
    /// stack.
    pub fn push(&self, scope: Arc<LifecycleScope>) -> bool {
        if scope.is_destroyed() {
            return false;
        }

        // Registered before taking the stack lock: an already-fired signal
        // runs the handler inline, and the handler takes the lock.
        let weak: Weak<StackShared> = Arc::downgrade(&self.shared);
        let listener = scope.on_destroy(Box::new(move |scope_id| {
            if let Some(shared) = weak.upgrade() {
                if shared.remove_by_id(scope_id).is_some() {
                    debug!(scope = %scope_id, "Destroyed scope left the stack");
                }
            }
        }));

        let pushed = {
            let mut items = self.shared.items.lock();
            // A destroy racing this push has marked the scope fired before
            // its handler waits on the lock held here.
            let rejected =
                scope.is_destroyed() || items.iter().any(|item| item.scope.id() == scope.id());
            if !rejected {
                items.push(StackItem {
                    scope: Arc::clone(&scope),
                    listener,
                });
            }
            !rejected
        };

        if pushed {
            debug!(scope = %scope.id(), kind = scope.kind(), "push");
        } else {
            scope.remove_destroy_listener(listener);
        }
        pushed
    }

    /// Remove the scope with `id` without destroying it.
    pub fn pop(&self, id: ScopeId) -> Option<Arc<LifecycleScope>> {
        let item = self.shared.remove_by_id(id)?;
        item.scope.remove_destroy_listener(item.listener);
        debug!(scope = %id, kind = item.scope.kind(), "pop");
        Some(item.scope)
    }

    /// The most recently pushed live scope.
    pub fn top(&self) -> Option<Arc<LifecycleScope>> {
        self.shared.items.lock().last().map(|item| Arc::clone(&item.scope))
    }

    /// Snapshot of the stack, bottom first.
    pub fn scopes(&self) -> Vec<Arc<LifecycleScope>> {
        self.shared
            .items
            .lock()
            .iter()
            .map(|item| Arc::clone(&item.scope))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the scope with `id` is on the stack.
    pub fn contains(&self, id: ScopeId) -> bool {
        self.shared.items.lock().iter().any(|item| item.scope.id() == id)
    }

    /// Whether any scope of `kind` is on the stack.
    pub fn contains_kind(&self, kind: &str) -> bool {
        self.find(kind).is_some()
    }

    /// The lowest scope of `kind`.
    pub fn find(&self, kind: &str) -> Option<Arc<LifecycleScope>> {
        self.shared
            .items
            .lock()
            .iter()
            .find(|item| item.scope.kind() == kind)
            .map(|item| Arc::clone(&item.scope))
    }

    /// Destroy every scope on the stack, bottom first.
    pub fn finish_all(&self) -> usize {
        let finished = Self::destroy_all(self.shared.drain_matching(|_| true));
        info!(finished, "Finished all scopes");
        finished
    }

    /// Destroy every scope whose kind is not in `keep`.
    pub fn finish_except(&self, keep: &[&str]) -> usize {
        let finished =
            Self::destroy_all(self.shared.drain_matching(|scope| !keep.contains(&scope.kind())));
        info!(finished, ?keep, "Finished scopes except kinds");
        finished
    }

    /// Destroy every scope whose kind is in `kinds`.
    pub fn finish(&self, kinds: &[&str]) -> usize {
        let finished =
            Self::destroy_all(self.shared.drain_matching(|scope| kinds.contains(&scope.kind())));
        info!(finished, ?kinds, "Finished scopes of kinds");
        finished
    }

    fn destroy_all(scopes: Vec<Arc<LifecycleScope>>) -> usize {
        scopes.iter().filter(|scope| scope.destroy()).count()
    }
}

impl fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<String> = self
            .shared
            .items
            .lock()
            .iter()
            .map(|item| item.scope.kind().to_string())
            .collect();
        f.debug_struct("ScopeStack").field("scopes", &kinds).finish()
    }
}
