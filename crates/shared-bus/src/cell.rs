//! # Versioned Cell
//!
//! A single value slot with a version counter. The counter starts at
//! [`UNPUBLISHED`] and moves up by exactly one per publish; subscribers
//! compare it with their own last-seen version to decide whether a value
//! is new to them.

use crate::events::Payload;

/// Version of a cell that has never been published to.
pub const UNPUBLISHED: i64 = -1;

/// Value slot plus monotonically increasing version.
#[derive(Debug)]
pub struct VersionedCell {
    value: Option<Payload>,
    version: i64,
}

impl VersionedCell {
    /// Create an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: None,
            version: UNPUBLISHED,
        }
    }

    /// Store a new value and return the version it was assigned.
    pub fn publish(&mut self, value: Payload) -> i64 {
        self.version += 1;
        self.value = Some(value);
        self.version
    }

    /// Current version, [`UNPUBLISHED`] if nothing was published yet.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Whether at least one value was published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.version > UNPUBLISHED
    }

    /// Latest value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Payload> {
        self.value.as_ref()
    }

    /// Latest value together with its version.
    #[must_use]
    pub fn snapshot(&self) -> Option<(i64, Payload)> {
        self.value.clone().map(|value| (self.version, value))
    }
}

impl Default for VersionedCell {
    fn default() -> Self {
        Self::new()
    }
}
