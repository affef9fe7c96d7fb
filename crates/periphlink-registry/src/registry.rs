use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use crate::handler::LibraryHandler;

/// Number of library slots.
pub const MAX_LIBRARIES: usize = 16;

/// Insertion-ordered table of peripheral libraries.
///
/// Slot `n` holds the `n`-th registered library. Slots are never cleared or
/// replaced, so an id stays valid for the life of the registry.
pub struct LibraryRegistry {
    slots: [Option<Box<dyn LibraryHandler>>; MAX_LIBRARIES],
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Store `handler` in the first free slot and return its id.
    pub fn register(&mut self, handler: Box<dyn LibraryHandler>) -> Result<u8> {
        let Some(index) = self.slots.iter().position(Option::is_none) else {
            debug!(name = handler.name(), "library registry full");
            return Err(RegistryError::RegistryFull {
                capacity: MAX_LIBRARIES,
            });
        };

        info!(id = index, name = handler.name(), "registered library");
        self.slots[index] = Some(handler);
        // MAX_LIBRARIES fits in a u8
        Ok(index as u8)
    }

    /// The library registered under `id`.
    pub fn lookup(&self, id: u8) -> Option<&dyn LibraryHandler> {
        self.slots.get(usize::from(id))?.as_deref()
    }

    /// The library registered under `id`, for dispatch.
    pub fn lookup_mut(&mut self, id: u8) -> Option<&mut (dyn LibraryHandler + 'static)> {
        self.slots.get_mut(usize::from(id))?.as_deref_mut()
    }

    /// `(id, name)` of every registered library, in ascending id order.
    pub fn names(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|handler| (id as u8, handler.name())))
    }

    /// Number of registered libraries.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub const fn capacity(&self) -> usize {
        MAX_LIBRARIES
    }
}

impl std::fmt::Debug for LibraryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.names()).finish()
    }
}
