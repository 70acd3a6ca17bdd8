//! Store entries and their lazily-filled container slots.

use crate::error::StoreError;
use shared_types::ScopeId;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::error;

/// Type-erased shared container.
pub(crate) type Container = Arc<dyn Any + Send + Sync>;

/// Container slot for one entry generation.
///
/// The slot is created under the store lock but filled outside it, so a
/// slow or re-entrant factory never blocks unrelated keys. `OnceLock`
/// guarantees a single factory run per slot; racing acquirers wait for the
/// winner's container.
pub(crate) struct ContainerSlot {
    key: String,
    generation: u64,
    type_name: &'static str,
    cell: OnceLock<Container>,
    factory_runs: AtomicU32,
}

impl ContainerSlot {
    fn new(key: &str, generation: u64, type_name: &'static str) -> Self {
        Self {
            key: key.to_string(),
            generation,
            type_name,
            cell: OnceLock::new(),
            factory_runs: AtomicU32::new(0),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Return the container, running `factory` if the slot is still empty.
    /// The flag reports whether this call ran the factory.
    pub(crate) fn get_or_create<T, F>(&self, factory: F) -> Result<(Arc<T>, bool), StoreError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut created = false;
        let container = self.cell.get_or_init(|| {
            // Counted once the factory returns; a panicking factory leaves
            // the slot empty for the next acquirer.
            let container = Arc::new(factory()) as Container;
            created = true;
            self.factory_runs.fetch_add(1, Ordering::AcqRel);
            container
        });

        if self.factory_runs.load(Ordering::Acquire) > 1 {
            error!(
                key = %self.key,
                generation = self.generation,
                "Factory ran more than once for one generation"
            );
            return Err(StoreError::DuplicateFactoryInvocation {
                key: self.key.clone(),
                generation: self.generation,
            });
        }

        let typed = Arc::clone(container)
            .downcast::<T>()
            .map_err(|_| StoreError::ContainerTypeMismatch {
                key: self.key.clone(),
                expected: std::any::type_name::<T>(),
                actual: self.type_name,
            })?;
        Ok((typed, created))
    }
}

/// A live store entry: container slot plus owning scopes.
pub(crate) struct StoreEntry {
    pub(crate) slot: Arc<ContainerSlot>,
    pub(crate) owners: HashSet<ScopeId>,
    type_id: TypeId,
}

impl StoreEntry {
    pub(crate) fn new<T: Any>(key: &str, generation: u64, owner: ScopeId) -> Self {
        Self {
            slot: Arc::new(ContainerSlot::new(key, generation, std::any::type_name::<T>())),
            owners: HashSet::from([owner]),
            type_id: TypeId::of::<T>(),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.slot.generation()
    }

    /// Fail unless the entry was created for containers of type `T`.
    pub(crate) fn check_type<T: Any>(&self, key: &str) -> Result<(), StoreError> {
        if self.type_id == TypeId::of::<T>() {
            return Ok(());
        }
        Err(StoreError::ContainerTypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
            actual: self.slot.type_name,
        })
    }
}
