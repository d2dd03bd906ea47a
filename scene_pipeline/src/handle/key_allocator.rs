use crate::utils::SlotAllocator;
use super::{Key, ObjectKind};

/// Per-kind Key issuer with LIFO slot reuse.
///
/// Owned by the logic side (`SceneProxy`); never shared across stages.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    slots: [SlotAllocator; 3],
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a Key for `kind`, reusing the most recently released slot
    pub fn allocate(&mut self, kind: ObjectKind) -> Key {
        let slots = &mut self.slots[kind.index()];
        let slot = slots.alloc();
        Key::new(kind, slot, slots.generation(slot))
    }

    /// Return the Key's slot to its kind's free list
    ///
    /// # Panics
    ///
    /// Panics on `Key::INVALID`, on a Key that was already released, or on
    /// a Key whose slot has since been reissued.
    pub fn release(&mut self, key: Key) {
        assert!(self.is_live(key), "releasing a Key that is not live: {:?}", key);
        self.slots[key.kind().index()].free(key.slot());
    }

    /// Whether `key` is the currently issued Key for its slot
    pub fn is_live(&self, key: Key) -> bool {
        let slots = &self.slots[key.kind().index()];
        key.is_valid() && slots.is_allocated(key.slot()) && slots.generation(key.slot()) == key.generation()
    }

    /// Number of live Keys of `kind`
    pub fn live_count(&self, kind: ObjectKind) -> u32 {
        self.slots[kind.index()].len()
    }

    /// Slots ever used for `kind` (mirror storage capacity)
    pub fn capacity(&self, kind: ObjectKind) -> u32 {
        self.slots[kind.index()].high_water_mark()
    }
}

#[cfg(test)]
#[path = "key_allocator_tests.rs"]
mod tests;
