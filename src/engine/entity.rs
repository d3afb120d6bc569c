//! Entity directory: liveness, generations and storage locations.
//!
//! The directory is the world's per-index bookkeeping: the current generation
//! of every slot, whether it is alive, which component mask the entity
//! carries and where its row lives in chunk storage. Indices of removed
//! entities are recycled through a FIFO freelist, which spreads generation
//! increments across indices instead of burning one slot's 16-bit counter.
//!
//! ## Invariants
//! - `generations`, `alive`, `masks` and `refs` always have equal length.
//! - An id is valid iff its generation matches the stored one; a matching
//!   generation with a dead slot is a corruption bug and asserts.
//! - Freelist entries are dead slots whose generation has not been exhausted;
//!   a slot whose generation passes [`MAX_GENERATION`] is retired for good.

use std::collections::VecDeque;

use crate::engine::storage::ChunkEntityRef;
use crate::engine::types::{ComponentMask, EntityId, MAX_GENERATION, MAX_INDEX};

#[derive(Default)]
pub(crate) struct EntityDirectory {
    generations: Vec<u16>,
    alive: Vec<bool>,
    masks: Vec<ComponentMask>,
    refs: Vec<ChunkEntityRef>,
    freelist: VecDeque<u64>,
}

impl EntityDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh or recycled id and marks its slot alive.
    pub(crate) fn allocate(&mut self) -> EntityId {
        match self.freelist.pop_front() {
            // Pop from the front to avoid burning through generations on a
            // single index while others sit idle.
            Some(index) => {
                let generation = self.generations[index as usize];
                debug_assert!(generation <= MAX_GENERATION);
                debug_assert!(!self.alive[index as usize]);
                self.alive[index as usize] = true;
                EntityId::new(index, generation)
            }
            None => {
                let index = self.generations.len() as u64;
                assert!(index <= MAX_INDEX, "entity index space exhausted");
                self.generations.push(0);
                self.alive.push(true);
                self.masks.push(ComponentMask::new());
                self.refs.push(ChunkEntityRef::default());
                EntityId::new(index, 0)
            }
        }
    }

    /// Returns `true` iff `id` names the current occupant of its slot.
    pub(crate) fn is_valid(&self, id: EntityId) -> bool {
        if !id.is_valid() {
            return false;
        }

        let index = id.index() as usize;
        // A valid-shaped id with an unknown index is a bug: non-default ids
        // are only ever minted by this directory.
        assert!(index < self.generations.len(), "entity index out of range");

        let matches = self.generations[index] == id.generation();
        assert!(
            !matches || self.alive[index],
            "entity not marked alive despite matching generation"
        );
        matches
    }

    /// Kills the slot at `index`: bumps the generation, clears the mask and
    /// storage ref, and recycles the index unless its generation is spent.
    pub(crate) fn retire(&mut self, index: u64) {
        let i = index as usize;
        debug_assert!(self.alive[i]);
        self.generations[i] += 1;
        self.alive[i] = false;
        self.masks[i].reset_all();
        self.refs[i].reset();

        if self.generations[i] <= MAX_GENERATION {
            self.freelist.push_back(index);
        }
    }

    #[inline]
    pub(crate) fn mask(&self, index: u64) -> &ComponentMask {
        &self.masks[index as usize]
    }

    #[inline]
    pub(crate) fn set_mask(&mut self, index: u64, mask: ComponentMask) {
        self.masks[index as usize] = mask;
    }

    #[inline]
    pub(crate) fn chunk_ref(&self, index: u64) -> ChunkEntityRef {
        self.refs[index as usize]
    }

    #[inline]
    pub(crate) fn set_chunk_ref(&mut self, index: u64, entity_ref: ChunkEntityRef) {
        self.refs[index as usize] = entity_ref;
    }

    #[inline]
    pub(crate) fn reset_chunk_ref(&mut self, index: u64) {
        self.refs[index as usize].reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycles_indices_fifo() {
        let mut directory = EntityDirectory::new();
        let a = directory.allocate();
        let b = directory.allocate();
        directory.retire(a.index());
        directory.retire(b.index());
        // Oldest retired index comes back first.
        let c = directory.allocate();
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
    }

    #[test]
    fn stale_ids_stop_matching() {
        let mut directory = EntityDirectory::new();
        let a = directory.allocate();
        assert!(directory.is_valid(a));
        directory.retire(a.index());
        assert!(!directory.is_valid(a));
        let b = directory.allocate();
        assert!(directory.is_valid(b));
        assert!(!directory.is_valid(a));
    }
}
