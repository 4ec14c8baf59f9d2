//! Texture slot assignment for the current batch.

use crate::backend::BatchTexture;

/// The slot table is full; the caller must flush and reset before retrying.
///
/// This is normal batching control flow, not an error surfaced to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotsExhausted;

/// Maps bound textures to small stable slot indices for one batch.
///
/// Slot 0 is reserved for the white "no texture / solid color" texture and
/// is never reassigned within a batch. Lookup is a linear scan, which is
/// fine at the default capacity of 32 slots.
pub struct TextureSlotTable<T: BatchTexture> {
    slots: Vec<T>,
    capacity: usize,
}

impl<T: BatchTexture> TextureSlotTable<T> {
    pub fn new(white: T, capacity: usize) -> Self {
        debug_assert!(capacity >= 2, "need the reserved slot plus at least one");
        let mut slots = Vec::with_capacity(capacity);
        slots.push(white);
        Self { slots, capacity }
    }

    /// Resolve `texture` to its slot, assigning the next free index on first
    /// use. A texture already resident keeps its index for the rest of the
    /// batch.
    pub fn resolve(&mut self, texture: &T) -> Result<i32, SlotsExhausted> {
        for (index, slot) in self.slots.iter().enumerate().skip(1) {
            if slot.id() == texture.id() {
                return Ok(index as i32);
            }
        }
        if self.slots.len() >= self.capacity {
            return Err(SlotsExhausted);
        }
        self.slots.push(texture.clone());
        Ok((self.slots.len() - 1) as i32)
    }

    /// The reserved solid-color slot. Never mutates the table.
    pub fn resolve_none(&self) -> i32 {
        0
    }

    /// Drop everything but the reserved white slot.
    pub fn reset(&mut self) {
        self.slots.truncate(1);
    }

    /// Live slots in binding order, including the reserved slot 0.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, texture)| (index as u32, texture))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        false // slot 0 is always resident
    }
}
