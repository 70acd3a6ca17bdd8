//! # Topics and Payloads
//!
//! Defines the two delivery modes a topic can have and the type-erased
//! payload that flows through the bus. Payload types are checked when a
//! value reaches a subscriber, not when the subscriber registers.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Replay policy of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicMode {
    /// New subscribers immediately receive the latest value, if any.
    Sticky,
    /// New subscribers only receive values published after they subscribed.
    NonSticky,
}

impl TopicMode {
    /// The other mode.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Sticky => Self::NonSticky,
            Self::NonSticky => Self::Sticky,
        }
    }
}

impl fmt::Display for TopicMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sticky => f.write_str("sticky"),
            Self::NonSticky => f.write_str("non-sticky"),
        }
    }
}

/// Registry key of a topic: its name plus its mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicKey {
    pub name: String,
    pub mode: TopicMode,
}

impl TopicKey {
    pub fn new(name: impl Into<String>, mode: TopicMode) -> Self {
        Self {
            name: name.into(),
            mode,
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.mode)
    }
}

/// A published value with its type erased.
///
/// Cloning is cheap: every clone shares the same allocation, so all
/// subscribers of one publish observe the same value.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Payload {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the value as `T`, if that is its type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether the value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the concrete type that was published.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
