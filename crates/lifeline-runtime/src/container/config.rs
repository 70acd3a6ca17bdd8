//! # Runtime Configuration
//!
//! Unified configuration for the bus, the store and telemetry.
//!
//! ## Environment Variables
//!
//! - `LL_ISOLATE_TOPIC_MODES`: keep sticky and non-sticky topics apart
//!   (default: false)
//! - `LL_SUBSCRIBER_WARN_THRESHOLD`: warn above this many subscribers per
//!   topic, `0` disables (default: 64)
//! - Telemetry variables, see [`TelemetryConfig::from_env`]

use lifeline_telemetry::TelemetryConfig;
use serde::Serialize;
use shared_bus::BusConfig;
use std::env;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuntimeConfig {
    /// Event bus configuration.
    pub bus: BusConfig,
    /// Logging and metrics configuration.
    pub telemetry: TelemetryConfig,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean variable held something other than true/false/1/0.
    #[error("{var} must be a boolean, got '{value}'")]
    InvalidFlag { var: &'static str, value: String },

    /// A numeric variable could not be parsed.
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut bus = BusConfig::default();

        if let Some(value) = lookup("LL_ISOLATE_TOPIC_MODES") {
            bus.isolate_modes = parse_flag("LL_ISOLATE_TOPIC_MODES", &value)?;
        }
        if let Some(value) = lookup("LL_SUBSCRIBER_WARN_THRESHOLD") {
            bus.subscriber_warn_threshold =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: "LL_SUBSCRIBER_WARN_THRESHOLD",
                        value: value.clone(),
                    })?;
        }

        Ok(Self {
            bus,
            telemetry: TelemetryConfig::from_lookup(&lookup),
        })
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}
