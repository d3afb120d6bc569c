//! Typed queries and access-checked entity views.
//!
//! Systems and queries declare the components they touch with marker types:
//!
//! * [`Read<T>`] grants shared access to `T`,
//! * [`Write<T>`] grants exclusive access to `T` (and shared, through it),
//! * [`With<T>`] requires `T` to be present but grants no data access.
//!
//! A single marker or a tuple of markers forms an [`AccessSpec`]:
//!
//! ```
//! use corral::{Read, Write, With};
//! # #[derive(Clone, Copy)] struct Transform;
//! # #[derive(Clone, Copy)] struct Health;
//! # #[derive(Clone, Copy)] struct Character;
//! type DamagedCharacter = (Read<Transform>, Write<Health>, With<Character>);
//! ```
//!
//! The spec contributes two derived masks: the **access mask** (union of all
//! three kinds, used to select matching archetypes) and the **write mask**
//! (writes only, advertised for conflict analysis).
//!
//! ## Compile-time access control
//!
//! [`Entity::get`] and [`Entity::get_mut`] are bounded by the lookup traits
//! [`CanRead`] and [`CanWrite`], which are implemented exactly for the specs
//! that name the component. Reading a component the spec never declared, or
//! writing through a `Read` grant, fails to compile. The second type
//! parameter of the lookup traits is an inference-only position index; call
//! sites spell it `_`, as in `entity.get::<Transform, _>()`.
//!
//! ## Safety by discipline
//!
//! The declared access sets are the aliasing contract. Views are plain copies
//! of a storage location and the borrow checker does not arbitrate between
//! two views of the same entity; correctness comes from the spec
//! declarations, the same way the scheduler's conflict analysis relies on
//! them. Structural world mutation is excluded while any query is alive
//! because queries hold a shared borrow of the world.

use std::marker::PhantomData;

use crate::engine::component::{type_id_of, Component};
use crate::engine::storage::{Chunk, ChunkEntityRef};
use crate::engine::types::{ComponentMask, EntityId, MAX_ENTITIES_PER_CHUNK};
use crate::engine::world::{Range, World};

/// Declares shared access to component `T`.
pub struct Read<T: Component>(PhantomData<T>);

/// Declares exclusive access to component `T`.
pub struct Write<T: Component>(PhantomData<T>);

/// Requires component `T` to be present without granting data access.
pub struct With<T: Component>(PhantomData<T>);

/// One element of an access specification; implemented by [`Read`],
/// [`Write`] and [`With`].
pub trait Grant {
    /// Sets this grant's bit in the access mask.
    fn set_access(mask: &mut ComponentMask);
    /// Sets this grant's bit in the write mask, when it grants writes.
    fn set_write(mask: &mut ComponentMask);
}

impl<T: Component> Grant for Read<T> {
    #[inline]
    fn set_access(mask: &mut ComponentMask) {
        mask.set(type_id_of::<T>());
    }
    #[inline]
    fn set_write(_mask: &mut ComponentMask) {}
}

impl<T: Component> Grant for Write<T> {
    #[inline]
    fn set_access(mask: &mut ComponentMask) {
        mask.set(type_id_of::<T>());
    }
    #[inline]
    fn set_write(mask: &mut ComponentMask) {
        mask.set(type_id_of::<T>());
    }
}

impl<T: Component> Grant for With<T> {
    #[inline]
    fn set_access(mask: &mut ComponentMask) {
        mask.set(type_id_of::<T>());
    }
    #[inline]
    fn set_write(_mask: &mut ComponentMask) {}
}

/// Marks a grant that licenses shared reads of `T`.
pub trait GrantsRead<T> {}
impl<T: Component> GrantsRead<T> for Read<T> {}
impl<T: Component> GrantsRead<T> for Write<T> {}

/// Marks a grant that licenses exclusive writes of `T`.
pub trait GrantsWrite<T> {}
impl<T: Component> GrantsWrite<T> for Write<T> {}

/// A complete access specification: a single grant or a tuple of grants.
pub trait AccessSpec {
    /// Union of every declared component (reads, writes and withs); the mask
    /// an archetype must contain to match.
    fn access_mask() -> ComponentMask;
    /// The declared writes only, for conflict analysis between systems.
    fn write_mask() -> ComponentMask;
}

impl<T: Component> AccessSpec for Read<T> {
    fn access_mask() -> ComponentMask {
        let mut mask = ComponentMask::new();
        <Read<T> as Grant>::set_access(&mut mask);
        mask
    }
    fn write_mask() -> ComponentMask {
        ComponentMask::new()
    }
}

impl<T: Component> AccessSpec for Write<T> {
    fn access_mask() -> ComponentMask {
        let mut mask = ComponentMask::new();
        <Write<T> as Grant>::set_access(&mut mask);
        mask
    }
    fn write_mask() -> ComponentMask {
        let mut mask = ComponentMask::new();
        <Write<T> as Grant>::set_write(&mut mask);
        mask
    }
}

impl<T: Component> AccessSpec for With<T> {
    fn access_mask() -> ComponentMask {
        let mut mask = ComponentMask::new();
        <With<T> as Grant>::set_access(&mut mask);
        mask
    }
    fn write_mask() -> ComponentMask {
        ComponentMask::new()
    }
}

macro_rules! access_spec_tuple {
    ($($name:ident),+) => {
        impl<$($name: Grant),+> AccessSpec for ($($name,)+) {
            fn access_mask() -> ComponentMask {
                let mut mask = ComponentMask::new();
                $($name::set_access(&mut mask);)+
                mask
            }
            fn write_mask() -> ComponentMask {
                let mut mask = ComponentMask::new();
                $($name::set_write(&mut mask);)+
                mask
            }
        }
    };
}

access_spec_tuple!(A);
access_spec_tuple!(A, B);
access_spec_tuple!(A, B, C);
access_spec_tuple!(A, B, C, D);
access_spec_tuple!(A, B, C, D, E);
access_spec_tuple!(A, B, C, D, E, F);

/// Inference-only index naming the grant position a lookup resolved to.
pub struct At<const N: usize>;

/// Implemented when the spec grants shared reads of `T`. The index parameter
/// is inferred; spell it `_` at call sites.
pub trait CanRead<T, I> {}

/// Implemented when the spec grants exclusive writes of `T`. The index
/// parameter is inferred; spell it `_` at call sites.
pub trait CanWrite<T, I> {}

impl<T: Component> CanRead<T, At<0>> for Read<T> {}
impl<T: Component> CanRead<T, At<0>> for Write<T> {}
impl<T: Component> CanWrite<T, At<0>> for Write<T> {}

macro_rules! grant_lookup {
    ($idx:ty => ($($pre:ident),*) $cur:ident ($($post:ident),*)) => {
        impl<T: Component, $($pre,)* $cur: GrantsRead<T>, $($post,)*> CanRead<T, $idx>
            for ($($pre,)* $cur, $($post,)*) {}
        impl<T: Component, $($pre,)* $cur: GrantsWrite<T>, $($post,)*> CanWrite<T, $idx>
            for ($($pre,)* $cur, $($post,)*) {}
    };
}

grant_lookup!(At<0> => () A ());
grant_lookup!(At<0> => () A (B));
grant_lookup!(At<1> => (A) B ());
grant_lookup!(At<0> => () A (B, C));
grant_lookup!(At<1> => (A) B (C));
grant_lookup!(At<2> => (A, B) C ());
grant_lookup!(At<0> => () A (B, C, D));
grant_lookup!(At<1> => (A) B (C, D));
grant_lookup!(At<2> => (A, B) C (D));
grant_lookup!(At<3> => (A, B, C) D ());
grant_lookup!(At<0> => () A (B, C, D, E));
grant_lookup!(At<1> => (A) B (C, D, E));
grant_lookup!(At<2> => (A, B) C (D, E));
grant_lookup!(At<3> => (A, B, C) D (E));
grant_lookup!(At<4> => (A, B, C, D) E ());
grant_lookup!(At<0> => () A (B, C, D, E, F));
grant_lookup!(At<1> => (A) B (C, D, E, F));
grant_lookup!(At<2> => (A, B) C (D, E, F));
grant_lookup!(At<3> => (A, B, C) D (E, F));
grant_lookup!(At<4> => (A, B, C, D) E (F));
grant_lookup!(At<5> => (A, B, C, D, E) F ());

/// Typed, access-checked view of one entity's storage row.
///
/// Views are by-value copies of a [`ChunkEntityRef`]; advancing the iterator
/// that produced one does not invalidate it. Structural mutation of the
/// entity does.
pub struct Entity<'w, S: AccessSpec> {
    entity_ref: ChunkEntityRef,
    _marker: PhantomData<(&'w World, S)>,
}

impl<'w, S: AccessSpec> Clone for Entity<'w, S> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'w, S: AccessSpec> Copy for Entity<'w, S> {}

impl<'w, S: AccessSpec> Entity<'w, S> {
    /// Builds a view of the valid entity `id`.
    pub fn new(world: &'w World, id: EntityId) -> Self {
        Self::from_ref(world.get_entity(id))
    }

    #[inline]
    pub(crate) fn from_ref(entity_ref: ChunkEntityRef) -> Self {
        Self {
            entity_ref,
            _marker: PhantomData,
        }
    }

    /// Returns the union mask of every component this view may touch.
    pub fn access_mask() -> ComponentMask {
        S::access_mask()
    }

    /// Returns the mask of components this view may mutate.
    pub fn write_mask() -> ComponentMask {
        S::write_mask()
    }

    /// Returns the id of the viewed entity.
    pub fn id(&self) -> EntityId {
        assert!(
            self.entity_ref.is_valid(),
            "entity view does not reference storage"
        );
        // SAFETY: chunks are pinned for the world lifetime 'w.
        unsafe { &*self.entity_ref.chunk() }.id_at(self.entity_ref.slot())
    }

    /// Shared access to component `T`; compiles only when the spec declares
    /// `Read<T>` or `Write<T>`. The entity must carry `T`.
    pub fn get<T: Component, I>(&self) -> &'w T
    where
        S: CanRead<T, I>,
    {
        let ptr = self.component_ptr::<T>();
        // SAFETY: the pointer is in bounds of a chunk pinned for 'w; shared
        // aliasing is licensed by the declared access set.
        unsafe { &*(ptr as *const T) }
    }

    /// Exclusive access to component `T`; compiles only when the spec
    /// declares `Write<T>`. The entity must carry `T`.
    pub fn get_mut<T: Component, I>(&mut self) -> &mut T
    where
        S: CanWrite<T, I>,
    {
        let ptr = self.component_ptr::<T>();
        // SAFETY: as in get; exclusivity is licensed by the declared access
        // set, which the scheduler keeps conflict-free between systems.
        unsafe { &mut *(ptr as *mut T) }
    }

    fn component_ptr<T: Component>(&self) -> *mut u8 {
        assert!(
            self.entity_ref.is_valid(),
            "entity view does not reference storage"
        );
        // SAFETY: pinned chunk, see above.
        let chunk: &Chunk = unsafe { &*self.entity_ref.chunk() };
        assert!(
            chunk.mask().test(type_id_of::<T>()),
            "The entity is missing this component"
        );
        chunk.component_ptr(type_id_of::<T>(), self.entity_ref.slot())
    }
}

/// Typed iterable over every entity matching an access spec.
pub struct Query<'w, S: AccessSpec> {
    range: Range<'w>,
    _spec: PhantomData<S>,
}

impl<'w, S: AccessSpec> Query<'w, S> {
    /// Resolves the spec's access mask against the world.
    pub fn new(world: &'w World) -> Self {
        Self::from_range(world.get_entities(&S::access_mask()))
    }

    /// Wraps an already-resolved range.
    pub fn from_range(range: Range<'w>) -> Self {
        Self {
            range,
            _spec: PhantomData,
        }
    }

    /// Returns the union mask of every component the query may touch.
    pub fn access_mask() -> ComponentMask {
        S::access_mask()
    }

    /// Returns the mask of components the query may mutate.
    pub fn write_mask() -> ComponentMask {
        S::write_mask()
    }

    /// Iterates the live entities of every matched chunk.
    pub fn iter(&self) -> QueryIter<'_, S> {
        QueryIter {
            chunks: self.range.chunks(),
            chunk_index: 0,
            slot: 0,
            _spec: PhantomData,
        }
    }
}

impl<'q, 'w, S: AccessSpec> IntoIterator for &'q Query<'w, S> {
    type Item = Entity<'q, S>;
    type IntoIter = QueryIter<'q, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator state: (chunk index, slot index), skipping empty slots.
pub struct QueryIter<'q, S: AccessSpec> {
    chunks: &'q [std::ptr::NonNull<Chunk>],
    chunk_index: usize,
    slot: usize,
    _spec: PhantomData<S>,
}

impl<'q, S: AccessSpec> Iterator for QueryIter<'q, S> {
    type Item = Entity<'q, S>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.chunk_index < self.chunks.len() {
            if self.slot == MAX_ENTITIES_PER_CHUNK {
                self.slot = 0;
                self.chunk_index += 1;
                continue;
            }
            let chunk_ptr = self.chunks[self.chunk_index];
            let slot = self.slot as u8;
            self.slot += 1;
            // SAFETY: range chunks are pinned for the borrow's lifetime.
            if unsafe { chunk_ptr.as_ref() }.id_at(slot).is_valid() {
                return Some(Entity::from_ref(ChunkEntityRef::new(
                    chunk_ptr.as_ptr(),
                    slot,
                )));
            }
        }
        None
    }
}
