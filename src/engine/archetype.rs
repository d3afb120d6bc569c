//! Archetype chunk lists.
//!
//! An [`Archetype`] owns every [`Chunk`] holding entities of one exact
//! component mask. The chunk list is append-only: chunks are created when no
//! free slot exists and are never destroyed or moved afterwards, so raw chunk
//! pointers held by the entity directory and by query ranges stay stable for
//! the lifetime of the world.
//!
//! Lookup by id ([`Archetype::find`]) is a linear scan over chunks and slots.
//! It is the one deliberately linear operation in the storage stack; hot
//! paths avoid it by caching a [`ChunkEntityRef`] per entity in the world
//! directory.

use std::ptr::NonNull;

use crate::engine::storage::{Chunk, ChunkEntityRef};
use crate::engine::types::{ComponentMask, EntityId};

/// All chunks of one exact component mask.
pub struct Archetype {
    mask: ComponentMask,
    chunks: Vec<NonNull<Chunk>>,
}

// SAFETY: the archetype exclusively owns its chunks; cross-thread use is
// bounded by the world's single-threaded mutation model.
unsafe impl Send for Archetype {}
// SAFETY: as above.
unsafe impl Sync for Archetype {}

impl Archetype {
    pub(crate) fn new(mask: ComponentMask) -> Self {
        Self {
            mask,
            chunks: Vec::new(),
        }
    }

    /// Returns the exact mask shared by every entity stored here.
    #[inline]
    pub fn mask(&self) -> &ComponentMask {
        &self.mask
    }

    /// Returns the number of chunks allocated so far.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the pinned chunk pointers, in allocation order.
    #[inline]
    pub(crate) fn chunks(&self) -> &[NonNull<Chunk>] {
        &self.chunks
    }

    /// Allocates a slot for `id` in the first chunk that has room, appending
    /// a fresh chunk when none does.
    pub(crate) fn allocate(&mut self, id: EntityId) -> ChunkEntityRef {
        let chunk_index = self
            .chunks
            .iter()
            .position(|chunk| {
                // SAFETY: chunk pointers are owned by this archetype and
                // alive until drop.
                unsafe { chunk.as_ref() }.has_free_slot()
            })
            .unwrap_or_else(|| {
                let chunk = Box::into_raw(Box::new(Chunk::new(&self.mask)));
                // SAFETY: Box::into_raw never returns null.
                self.chunks.push(unsafe { NonNull::new_unchecked(chunk) });
                self.chunks.len() - 1
            });

        let chunk_ptr = self.chunks[chunk_index].as_ptr();
        // SAFETY: the pointer was just taken from the owned list.
        let slot = unsafe { &mut *chunk_ptr }.allocate(id);
        ChunkEntityRef::new(chunk_ptr, slot)
    }

    /// Scans every chunk for `id`; returns an invalid ref when absent.
    pub(crate) fn find(&self, id: EntityId) -> ChunkEntityRef {
        for chunk in &self.chunks {
            // SAFETY: owned, live chunk.
            if let Some(slot) = unsafe { chunk.as_ref() }.find(id) {
                return ChunkEntityRef::new(chunk.as_ptr(), slot);
            }
        }
        ChunkEntityRef::default()
    }

    /// Frees the slot holding `id`. The entity must be stored here.
    pub(crate) fn destroy(&mut self, id: EntityId) {
        let entity_ref = self.find(id);
        assert!(entity_ref.is_valid(), "entity not found in archetype");
        // SAFETY: find returned a pointer from the owned list.
        unsafe { &mut *entity_ref.chunk() }.destroy(entity_ref.slot(), id);
    }
}

impl Drop for Archetype {
    fn drop(&mut self) {
        for chunk in self.chunks.drain(..) {
            // SAFETY: every pointer came from Box::into_raw in allocate and
            // is dropped exactly once.
            unsafe {
                drop(Box::from_raw(chunk.as_ptr()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::type_id_of;
    use crate::engine::types::MAX_ENTITIES_PER_CHUNK;

    #[derive(Clone, Copy)]
    struct Marker(#[allow(dead_code)] u8);

    fn marker_mask() -> ComponentMask {
        let mut mask = ComponentMask::new();
        mask.set(type_id_of::<Marker>());
        mask
    }

    #[test]
    fn appends_a_chunk_when_full() {
        let mut archetype = Archetype::new(marker_mask());
        for i in 0..MAX_ENTITIES_PER_CHUNK as u64 {
            let _ = archetype.allocate(EntityId::new(i, 0));
        }
        assert_eq!(archetype.chunk_count(), 1);
        let spill = archetype.allocate(EntityId::new(999, 0));
        assert_eq!(archetype.chunk_count(), 2);
        assert!(spill.is_valid());
        assert_eq!(spill.slot(), 0);
    }

    #[test]
    fn find_locates_across_chunks() {
        let mut archetype = Archetype::new(marker_mask());
        for i in 0..(MAX_ENTITIES_PER_CHUNK as u64 + 3) {
            let _ = archetype.allocate(EntityId::new(i, 0));
        }
        let target = EntityId::new(MAX_ENTITIES_PER_CHUNK as u64 + 1, 0);
        let found = archetype.find(target);
        assert!(found.is_valid());
        // SAFETY: ref came from the archetype just above.
        assert_eq!(unsafe { &*found.chunk() }.id_at(found.slot()), target);
        assert!(!archetype.find(EntityId::new(5_000, 0)).is_valid());
    }

    #[test]
    fn destroyed_slots_are_reused_before_new_chunks() {
        let mut archetype = Archetype::new(marker_mask());
        for i in 0..MAX_ENTITIES_PER_CHUNK as u64 {
            let _ = archetype.allocate(EntityId::new(i, 0));
        }
        archetype.destroy(EntityId::new(40, 0));
        let reused = archetype.allocate(EntityId::new(777, 0));
        assert_eq!(archetype.chunk_count(), 1);
        assert_eq!(reused.slot(), 40);
    }
}
