//! # Shared Store - Scope-Owned Shared State
//!
//! Lets several short-lived scopes share one state container under a
//! string key, and drops that container from the registry once every
//! owning scope has been destroyed.
//!
//! ```text
//!  scope A ──┐                ┌──────────────────────────┐
//!            ├─ acquire(k) ─► │ k → { gen, owners, slot } │
//!  scope B ──┘                └──────────────────────────┘
//!      │                                  ▲
//!      └────── on destroy ── release ─────┘  (evict when owners = ∅)
//! ```
//!
//! ## Guarantees
//!
//! - One factory run per entry generation, even under concurrent acquires.
//! - Owners are a set: acquiring twice from the same scope adds nothing.
//! - Eviction is checked and applied under the same lock.
//! - Destroy notifications from an evicted generation never touch a newer one.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod entry;
pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::ScopedStore;
