//! # Shared Bus - Scope-Aware Event Bus
//!
//! Passes events between components that do not know about each other.
//!
//! ## Topics
//!
//! A topic is a string key plus a [`TopicMode`]:
//!
//! - **Sticky**: a new subscriber immediately receives the latest value.
//! - **NonSticky**: a new subscriber only receives later values.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Component A  │                    │ Component B  │
//! │              │    publish()       │   (scope)    │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │ cell+version │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Guarantees
//!
//! - **No replay on non-sticky topics**: subscribers start aligned with the
//!   topic's current version.
//! - **At most once per version**: each subscriber claims a version before
//!   its callback runs.
//! - **Scope-bound cleanup**: a subscription bound to a scope is removed
//!   when the scope is destroyed.
//! - **Isolated failures**: a subscriber that rejects a payload does not stop
//!   delivery to the others.
//!
//! Topics are never evicted; they live as long as the bus.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod cell;
pub mod config;
pub mod error;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use cell::{VersionedCell, UNPUBLISHED};
pub use config::BusConfig;
pub use error::BusError;
pub use events::{Payload, TopicKey, TopicMode};
pub use publisher::{DeliveryFailure, EventBus, PublishReport};
pub use subscriber::{SubscriberAdapter, SubscriptionHandle, SubscriptionId};
