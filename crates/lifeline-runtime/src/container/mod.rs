//! # Runtime Container
//!
//! Central container holding the bus, the store and the scope stack with
//! shared metrics, built once from [`RuntimeConfig`] and injected wherever a
//! process-wide default is not wanted.

pub mod app;
pub mod config;

pub use app::AppContainer;
pub use config::{ConfigError, RuntimeConfig};
