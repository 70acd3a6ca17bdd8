//! # Lifeline Telemetry
//!
//! Observability for hosts embedding the bus and the store.
//!
//! ## Components
//!
//! - **Logging**: a `tracing-subscriber` stack with `EnvFilter`, pretty or
//!   JSON output
//! - **Metrics**: a Prometheus-backed [`MetricsRecorder`](shared_types::MetricsRecorder)
//!   plus text encoding for scraping
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lifeline_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let guard = init_telemetry(TelemetryConfig::from_env())?;
//! let bus = shared_bus::EventBus::with_metrics(Default::default(), guard.recorder());
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LL_SERVICE_NAME` | `lifeline` | Service name in logs |
//! | `LL_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `LL_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `LL_JSON_LOGS` | `false` | JSON log lines |
//! | `LL_METRICS` | `true` | Register Prometheus collectors |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging, LoggingHandle};
pub use metrics::{encode_metrics, encode_registry, register_metrics, PrometheusRecorder, REGISTRY};

use shared_types::{MetricsRecorder, NoOpMetrics};
use std::sync::Arc;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and, if enabled, the global Prometheus recorder.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first, so a failure leaves no global subscriber behind
    let prometheus = if config.metrics_enabled {
        Some(register_metrics()?)
    } else {
        None
    };

    let logging = init_logging(&config)?;

    Ok(TelemetryGuard {
        config,
        _logging: logging,
        prometheus,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    config: TelemetryConfig,
    _logging: LoggingHandle,
    prometheus: Option<Arc<PrometheusRecorder>>,
}

impl TelemetryGuard {
    /// Recorder to hand to the bus and the store.
    pub fn recorder(&self) -> Arc<dyn MetricsRecorder> {
        match &self.prometheus {
            Some(recorder) => recorder.clone(),
            None => Arc::new(NoOpMetrics),
        }
    }

    /// The configuration telemetry was started with.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry");
    }
}
