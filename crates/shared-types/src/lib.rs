//! # Shared Types Crate
//!
//! Types every registry in the workspace agrees on:
//!
//! - **Scopes**: the [`Scope`] contract, the one-shot [`DestroySignal`] that
//!   binds registries to a scope, and the ready-made [`LifecycleScope`].
//! - **Metrics**: the [`MetricsRecorder`] seam reported to by the bus and
//!   the store.
//!
//! ## Design Principles
//!
//! - **Non-owning bindings**: registries hold a [`ScopeId`] or a
//!   [`WeakScopeRef`], never a strong reference to the scope.
//! - **Exactly-once teardown**: a scope's destroy handlers run once, in
//!   registration order.

pub mod metrics;
pub mod scope;

pub use metrics::{
    CompositeRecorder, LifecycleMetrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics,
};
pub use scope::{
    DestroyHandler, DestroySignal, LifecycleScope, ListenerId, Scope, ScopeId, ScopeRef,
    WeakScopeRef,
};
