//! Component type registry.
//!
//! Components are ordinary Rust values; the runtime never stores type-erased
//! trait objects for them. Instead, every component type is assigned a dense
//! process-unique id on first use, and its byte size and alignment are
//! recorded in a parallel table. Chunk storage only needs those two numbers
//! to lay out and copy columns.
//!
//! ## Invariants
//! - Ids are assigned monotonically starting at 0 and never reused.
//! - `size_of(id)` and `align_of(id)` are written once, at assignment.
//! - Ids are process-local and must not be persisted: a type's id depends on
//!   the order in which types are first touched.
//!
//! ## Concurrency
//! The registry is global and shared by every world in the process. First use
//! of a type is serialised by the registry lock; the id counter itself is an
//! atomic so the fast path never observes a torn id. Repeated lookups take
//! the read lock only.

use std::any::TypeId;
use std::collections::HashMap;
use std::mem::{align_of, size_of};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};

use crate::engine::types::{ComponentMask, MAX_TYPES};

/// Strictest alignment a component type may require. Chunk columns are padded
/// to this bound, so any component at or below it lands aligned.
pub const MAX_COMPONENT_ALIGN: usize = 16;

/// Marker for types that can be stored as components.
///
/// A component must be trivially copyable in the C sense: plain `Copy` data
/// with no destructor. Cross-archetype migration moves component payloads
/// with a raw byte copy, which is exactly what `Copy` licenses.
///
/// The trait is blanket-implemented; any `Copy + Send + Sync + 'static` type
/// qualifies, including zero-sized tag types.
pub trait Component: Copy + Send + Sync + 'static {}

impl<T: Copy + Send + Sync + 'static> Component for T {}

struct TypeRegistry {
    by_type: HashMap<TypeId, u64>,
    sizes: Vec<usize>,
    aligns: Vec<usize>,
}

static REGISTRY: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();
static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(0);

fn registry() -> &'static RwLock<TypeRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(TypeRegistry {
            by_type: HashMap::new(),
            sizes: Vec::new(),
            aligns: Vec::new(),
        })
    })
}

/// Returns the dense type id of component type `T`, assigning one on first
/// use.
///
/// Ids are stable for the lifetime of the process and shared across worlds.
/// Exhausting the id space (more than [`MAX_TYPES`] distinct component types)
/// is fatal.
pub fn type_id_of<T: Component>() -> u64 {
    let key = TypeId::of::<T>();

    {
        let reg = registry().read().unwrap_or_else(|e| e.into_inner());
        if let Some(&id) = reg.by_type.get(&key) {
            return id;
        }
    }

    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    // Another thread may have registered T between the two locks.
    if let Some(&id) = reg.by_type.get(&key) {
        return id;
    }

    assert!(
        align_of::<T>() <= MAX_COMPONENT_ALIGN,
        "component alignment exceeds the supported maximum"
    );

    let id = NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed);
    assert!((id as usize) < MAX_TYPES, "component type capacity exceeded");

    debug_assert_eq!(reg.sizes.len() as u64, id);
    reg.by_type.insert(key, id);
    reg.sizes.push(size_of::<T>());
    reg.aligns.push(align_of::<T>());
    id
}

/// Returns the byte size recorded for a registered type id.
pub fn component_size(type_id: u64) -> usize {
    let reg = registry().read().unwrap_or_else(|e| e.into_inner());
    assert!(
        (type_id as usize) < reg.sizes.len(),
        "unregistered component type id"
    );
    reg.sizes[type_id as usize]
}

/// Returns the alignment recorded for a registered type id.
pub fn component_align(type_id: u64) -> usize {
    let reg = registry().read().unwrap_or_else(|e| e.into_inner());
    assert!(
        (type_id as usize) < reg.aligns.len(),
        "unregistered component type id"
    );
    reg.aligns[type_id as usize]
}

/// A tuple of component types, usable where a set of components is meant
/// rather than a single one (e.g. `World::has_components::<(A, B)>`).
pub trait ComponentSet {
    /// Returns the mask with the bit of every member type set.
    fn mask() -> ComponentMask;
}

macro_rules! component_set_tuple {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn mask() -> ComponentMask {
                let mut mask = ComponentMask::new();
                $(mask.set(type_id_of::<$name>());)+
                mask
            }
        }
    };
}

component_set_tuple!(A);
component_set_tuple!(A, B);
component_set_tuple!(A, B, C);
component_set_tuple!(A, B, C, D);
component_set_tuple!(A, B, C, D, E);
component_set_tuple!(A, B, C, D, E, F);
component_set_tuple!(A, B, C, D, E, F, G);
component_set_tuple!(A, B, C, D, E, F, G, H);
