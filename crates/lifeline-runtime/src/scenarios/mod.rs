//! # Demo Scenarios
//!
//! End-to-end flows driven against an [`AppContainer`](crate::AppContainer):
//!
//! - [`login`]: a non-sticky topic never replays to late subscribers
//! - [`cart`]: a sticky total replays on subscribe while several scopes share
//!   one cart through the store

pub mod cart;
pub mod login;

use shared_bus::BusError;
use shared_store::StoreError;
use thiserror::Error;

/// Errors raised while driving a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("bus: {0}")]
    Bus(#[from] BusError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}
