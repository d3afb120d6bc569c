//! # Corral
//!
//! Archetype-chunked Entity-Component-System runtime.
//!
//! Entities are grouped by the exact set of component types they carry.
//! Each such set (an *archetype*) stores its entities in fixed-capacity,
//! column-major chunks, so iterating one component type touches contiguous
//! memory. Queries declare their component access with marker types checked
//! at compile time, and a scheduler orders systems along explicit
//! `execute_after` edges.
//!
//! ## Design goals
//! - Dense, cache-friendly columnar storage
//! - Stable storage references across unrelated mutations
//! - Compile-time read/write access control
//! - Deterministic, dependency-ordered serial execution
//!
//! ## Quick tour
//!
//! ```
//! use corral::prelude::*;
//!
//! #[derive(Clone, Copy)]
//! struct Position { x: f32 }
//! #[derive(Clone, Copy)]
//! struct Velocity { dx: f32 }
//!
//! let mut world = World::new();
//! let e = world.add_entity();
//! world.add_component(e, Position { x: 0.0 });
//! world.add_component(e, Velocity { dx: 1.5 });
//!
//! let query = Query::<(Read<Velocity>, Write<Position>)>::new(&world);
//! for mut entity in &query {
//!     let dx = entity.get::<Velocity, _>().dx;
//!     entity.get_mut::<Position, _>().x += dx;
//! }
//!
//! assert_eq!(world.get_component::<Position>(e).x, 1.5);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;
pub mod profiling;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::types::{
    ComponentMask, EntityId, MAX_ENTITIES_PER_CHUNK, MAX_GENERATION, MAX_INDEX, MAX_TYPES,
};

pub use engine::component::{
    component_align, component_size, type_id_of, Component, ComponentSet, MAX_COMPONENT_ALIGN,
};

pub use engine::storage::{Chunk, ChunkEntityRef};

pub use engine::world::{Range, World};

pub use engine::query::{
    AccessSpec, At, CanRead, CanWrite, Entity, Query, QueryIter, Read, With, Write,
};

pub use engine::systems::System;

pub use engine::scheduler::{Schedule, Scheduler, SystemRef};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use corral::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Component, ComponentMask, Entity, EntityId, Query, Read, Schedule, Scheduler, SystemRef,
        With, World, Write,
    };
}
