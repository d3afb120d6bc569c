//! World: archetype table, entity directory and query cache.
//!
//! The [`World`] is the orchestration layer of the runtime. It owns:
//!
//! * the **archetype table**, mapping each exact [`ComponentMask`] to the
//!   [`Archetype`] storing entities of that mask,
//! * the **entity directory**, tracking per-index generation, liveness,
//!   current mask and a cached storage location,
//! * the **query cache**, mapping a requested mask to the archetypes that
//!   satisfy it.
//!
//! ## Structural mutation
//!
//! Adding or removing a component moves the entity between archetypes: a slot
//! is allocated in the destination, every shared column is copied byte for
//! byte, the source slot is freed and the directory is updated. Any
//! previously obtained [`ChunkEntityRef`] for that entity is invalid
//! afterwards.
//!
//! Structural operations take `&mut self`; queries and reads take `&self`.
//! The borrow checker therefore rules out structural mutation while any
//! query borrow is alive, which is what keeps the raw chunk pointers inside
//! ranges dependable.
//!
//! ## Query cache
//!
//! An archetype matches a query mask when the archetype's mask contains every
//! requested bit. The first `get_entities` call for a mask scans the table
//! and memoises the matching archetype keys; creating a new archetype later
//! extends every affected cache entry in place, so a cached mask never has to
//! be recomputed.
//!
//! ## Failure model
//!
//! Precondition violations are programming errors and fail fast: passing a
//! stale id to a component operation, adding a component twice, or removing
//! an absent one all panic. The single deliberate exception is
//! [`World::remove_entity`], which tolerates stale ids so removal is
//! idempotent.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::RwLock;

use crate::engine::archetype::Archetype;
use crate::engine::component::{type_id_of, Component, ComponentSet};
use crate::engine::entity::EntityDirectory;
use crate::engine::storage::{Chunk, ChunkEntityRef};
use crate::engine::types::{ComponentMask, EntityId};
use crate::profiling::profiler;

/// A flat, iteration-ready list of chunks matching one query mask.
///
/// The range borrows the world shared, so structural mutation is excluded
/// while it is alive; the chunk pointers inside stay pinned for the world's
/// whole lifetime regardless.
pub struct Range<'w> {
    chunks: Vec<NonNull<Chunk>>,
    _world: PhantomData<&'w World>,
}

impl<'w> Range<'w> {
    fn new(chunks: Vec<NonNull<Chunk>>) -> Self {
        Self {
            chunks,
            _world: PhantomData,
        }
    }

    /// Returns the number of chunks in the range.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub(crate) fn chunks(&self) -> &[NonNull<Chunk>] {
        &self.chunks
    }
}

/// Container for entities grouped by the exact set of component types they
/// carry.
#[derive(Default)]
pub struct World {
    archetypes: HashMap<ComponentMask, Archetype>,
    query_cache: RwLock<HashMap<ComponentMask, Vec<ComponentMask>>>,
    directory: EntityDirectory,
}

// SAFETY: a world owns its directory, archetypes and chunks outright; the raw
// pointers inside only ever target that owned storage, so moving the world to
// another thread moves everything they point at along with it. Independent
// worlds share nothing but the global type registry.
unsafe impl Send for World {}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self {
            archetypes: HashMap::new(),
            query_cache: RwLock::new(HashMap::new()),
            directory: EntityDirectory::new(),
        }
    }

    /// Creates a new entity with no components and returns its id.
    ///
    /// Indices of removed entities are recycled FIFO with a bumped
    /// generation, so stale handles to the previous occupant stay invalid.
    pub fn add_entity(&mut self) -> EntityId {
        self.directory.allocate()
    }

    /// Removes `id` and frees its storage row.
    ///
    /// Removing an invalid or already-removed id is a no-op, which makes
    /// removal idempotent.
    pub fn remove_entity(&mut self, id: EntityId) {
        if !self.is_valid(id) {
            return;
        }

        let index = id.index();
        let mask = *self.directory.mask(index);
        if !mask.is_empty() {
            self.archetypes
                .get_mut(&mask)
                .expect("archetype missing for a live entity mask")
                .destroy(id);
        }
        self.directory.retire(index);
    }

    /// Returns `true` iff `id` names a live entity of this world.
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.directory.is_valid(id)
    }

    /// Attaches component `value` to `id`.
    ///
    /// The id must be valid and the entity must not already carry `T`. The
    /// entity migrates to the archetype of its widened mask; every other
    /// component value is preserved byte for byte.
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) {
        let _span = profiler::span("World::add_component");
        assert!(self.is_valid(id), "invalid or stale entity id");

        let index = id.index();
        let type_id = type_id_of::<T>();
        let old_mask = *self.directory.mask(index);
        assert!(
            !old_mask.test(type_id),
            "The entity already has this component"
        );

        let mut new_mask = old_mask;
        new_mask.set(type_id);
        self.directory.set_mask(index, new_mask);
        self.ensure_archetype(new_mask);

        let new_ref = self
            .archetypes
            .get_mut(&new_mask)
            .expect("destination archetype was just ensured")
            .allocate(id);

        if !old_mask.is_empty() {
            let old_archetype = self
                .archetypes
                .get_mut(&old_mask)
                .expect("source archetype missing");
            let old_ref = old_archetype.find(id);
            assert!(old_ref.is_valid(), "entity not found in archetype");
            // SAFETY: both refs point into chunks pinned by their archetypes;
            // the masks differ, so the chunks are distinct.
            unsafe {
                (*old_ref.chunk()).copy_row_to(
                    old_ref.slot(),
                    &*new_ref.chunk(),
                    new_ref.slot(),
                    None,
                );
            }
            old_archetype.destroy(id);
        }

        // SAFETY: new_ref addresses the freshly allocated, still-unobserved
        // slot; the column for T exists because new_mask contains it.
        unsafe {
            let dst = (*new_ref.chunk()).component_ptr(type_id, new_ref.slot());
            std::ptr::write(dst as *mut T, value);
        }
        self.directory.set_chunk_ref(index, new_ref);
    }

    /// Detaches component `T` from `id`.
    ///
    /// The id must be valid and the entity must carry `T`. When the entity
    /// keeps other components it migrates to the narrowed archetype with all
    /// remaining values preserved; otherwise its storage row is simply freed.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) {
        let _span = profiler::span("World::remove_component");
        assert!(self.is_valid(id), "invalid or stale entity id");

        let index = id.index();
        let type_id = type_id_of::<T>();
        let old_mask = *self.directory.mask(index);
        assert!(
            old_mask.test(type_id),
            "The entity doesn't have this component"
        );

        let mut new_mask = old_mask;
        new_mask.reset(type_id);
        self.directory.set_mask(index, new_mask);

        if new_mask.is_empty() {
            // Entities without components are not stored in any archetype.
            self.archetypes
                .get_mut(&old_mask)
                .expect("source archetype missing")
                .destroy(id);
            self.directory.reset_chunk_ref(index);
            return;
        }

        self.ensure_archetype(new_mask);
        let new_ref = self
            .archetypes
            .get_mut(&new_mask)
            .expect("destination archetype was just ensured")
            .allocate(id);

        let old_archetype = self
            .archetypes
            .get_mut(&old_mask)
            .expect("source archetype missing");
        let old_ref = old_archetype.find(id);
        assert!(old_ref.is_valid(), "entity not found in archetype");
        // SAFETY: pinned, distinct chunks as in add_component.
        unsafe {
            (*old_ref.chunk()).copy_row_to(
                old_ref.slot(),
                &*new_ref.chunk(),
                new_ref.slot(),
                Some(type_id),
            );
        }
        old_archetype.destroy(id);
        self.directory.set_chunk_ref(index, new_ref);
    }

    /// Returns `true` iff the valid entity `id` carries component `T`.
    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        assert!(self.is_valid(id), "invalid or stale entity id");
        self.directory.mask(id.index()).test(type_id_of::<T>())
    }

    /// Returns `true` iff the valid entity `id` carries every component of
    /// the tuple `S`, e.g. `world.has_components::<(Pos, Vel)>(id)`.
    pub fn has_components<S: ComponentSet>(&self, id: EntityId) -> bool {
        assert!(self.is_valid(id), "invalid or stale entity id");
        self.directory.mask(id.index()).test_all(&S::mask())
    }

    /// Returns the component `T` of the valid entity `id`, which must carry
    /// it.
    pub fn get_component<T: Component>(&self, id: EntityId) -> &T {
        let entity_ref = self.component_ref::<T>(id);
        // SAFETY: the ref was validated against the directory; the chunk is
        // pinned and the column exists.
        unsafe {
            let ptr = (*entity_ref.chunk()).component_ptr(type_id_of::<T>(), entity_ref.slot());
            &*(ptr as *const T)
        }
    }

    /// Mutable access to the component `T` of the valid entity `id`, which
    /// must carry it.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> &mut T {
        let entity_ref = self.component_ref::<T>(id);
        // SAFETY: as in get_component; `&mut self` guarantees exclusivity.
        unsafe {
            let ptr = (*entity_ref.chunk()).component_ptr(type_id_of::<T>(), entity_ref.slot());
            &mut *(ptr as *mut T)
        }
    }

    fn component_ref<T: Component>(&self, id: EntityId) -> ChunkEntityRef {
        assert!(self.is_valid(id), "invalid or stale entity id");
        let index = id.index();
        assert!(
            self.directory.mask(index).test(type_id_of::<T>()),
            "The entity doesn't have this component"
        );
        let entity_ref = self.directory.chunk_ref(index);
        assert!(entity_ref.is_valid(), "entity has no storage row");
        entity_ref
    }

    /// Returns the storage location of the valid entity `id`.
    ///
    /// The ref is invalidated by any structural mutation of this entity.
    pub fn get_entity(&self, id: EntityId) -> ChunkEntityRef {
        assert!(self.is_valid(id), "invalid or stale entity id");
        self.directory.chunk_ref(id.index())
    }

    /// Returns every chunk of every archetype whose mask contains `mask`.
    ///
    /// The first call for a given mask scans the archetype table and caches
    /// the matching keys; later calls reuse the entry, which structural
    /// mutation keeps up to date incrementally.
    pub fn get_entities(&self, mask: &ComponentMask) -> Range<'_> {
        {
            let cache = self.query_cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(keys) = cache.get(mask) {
                return Range::new(self.collect_chunks(keys));
            }
        }

        let _span = profiler::span("World::get_entities/cold");
        let mut cache = self.query_cache.write().unwrap_or_else(|e| e.into_inner());
        let keys = cache.entry(*mask).or_insert_with(|| {
            self.archetypes
                .keys()
                .filter(|archetype_mask| archetype_mask.test_all(mask))
                .copied()
                .collect()
        });
        Range::new(self.collect_chunks(keys))
    }

    fn collect_chunks(&self, keys: &[ComponentMask]) -> Vec<NonNull<Chunk>> {
        let mut chunks = Vec::new();
        for key in keys {
            let archetype = self
                .archetypes
                .get(key)
                .expect("query cache names a missing archetype");
            chunks.extend_from_slice(archetype.chunks());
        }
        chunks
    }

    /// Materialises the archetype for `mask` and keeps the query cache
    /// consistent: the new archetype is appended to every cached entry it
    /// satisfies, and a complete entry for `mask` itself is installed so a
    /// later query on exactly this mask is already warm.
    fn ensure_archetype(&mut self, mask: ComponentMask) {
        if self.archetypes.contains_key(&mask) {
            return;
        }
        self.archetypes.insert(mask, Archetype::new(mask));

        let mut cache = self.query_cache.write().unwrap_or_else(|e| e.into_inner());
        for (cached_mask, keys) in cache.iter_mut() {
            if mask.test_all(cached_mask) {
                keys.push(mask);
            }
        }
        if !cache.contains_key(&mask) {
            let keys = self
                .archetypes
                .keys()
                .filter(|archetype_mask| archetype_mask.test_all(&mask))
                .copied()
                .collect();
            cache.insert(mask, keys);
        }
    }
}
