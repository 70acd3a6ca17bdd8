//! # Lifeline Runtime Library
//!
//! Wires the registries together for hosts and tests. The demo entry point
//! is the `main.rs` binary.
//!
//! ## Modular Structure
//!
//! - `container/` - Runtime configuration and the [`AppContainer`]
//! - `registry/` - The [`ScopeStack`] of live scopes
//! - `scenarios/` - Login and cart-total flows driven end to end

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod registry;
pub mod scenarios;

pub use container::{AppContainer, ConfigError, RuntimeConfig};
pub use registry::ScopeStack;
pub use scenarios::ScenarioError;
