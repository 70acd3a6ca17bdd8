//! Bus configuration
//!
//! # Example
//!
//! ```ignore
//! use shared_bus::BusConfig;
//!
//! let config = BusConfig::default()
//!     .with_isolated_modes(true)
//!     .with_subscriber_warn_threshold(128);
//! ```

use serde::{Deserialize, Serialize};

/// Default subscriber count above which a topic logs a warning.
pub const DEFAULT_SUBSCRIBER_WARN_THRESHOLD: usize = 64;

/// Event bus configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Keep sticky and non-sticky topics in separate namespaces.
    ///
    /// When `false` (the default) a name belongs to exactly one mode and
    /// using it under the other mode fails with `TopicModeConflict`.
    pub isolate_modes: bool,
    /// Warn when a topic gains more subscribers than this. `0` disables the
    /// warning.
    pub subscriber_warn_threshold: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            isolate_modes: false,
            subscriber_warn_threshold: DEFAULT_SUBSCRIBER_WARN_THRESHOLD,
        }
    }
}

impl BusConfig {
    /// Builder-style method to set mode isolation
    pub fn with_isolated_modes(mut self, isolate: bool) -> Self {
        self.isolate_modes = isolate;
        self
    }

    /// Builder-style method to set the subscriber warning threshold
    pub fn with_subscriber_warn_threshold(mut self, threshold: usize) -> Self {
        self.subscriber_warn_threshold = threshold;
        self
    }

    /// Whether a topic with `count` subscribers should be reported.
    pub(crate) fn exceeds_warn_threshold(&self, count: usize) -> bool {
        self.subscriber_warn_threshold != 0 && count > self.subscriber_warn_threshold
    }
}
