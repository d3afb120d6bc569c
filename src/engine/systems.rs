//! System records.
//!
//! A system is a user function with a declared component access pattern. The
//! scheduler stores it in canonical form: a type-erased run closure that
//! resolves its own queries against the world, plus the two derived masks.
//! The masks are what ordering and conflict analysis work with; the runtime
//! itself executes systems serially, and the masks let an external executor
//! decide which systems could overlap (two systems may run in parallel iff
//! each one's write mask is disjoint from the other's access mask).

use crate::engine::types::ComponentMask;
use crate::engine::world::World;

/// A registered system in canonical, type-erased form.
pub struct System {
    run: Box<dyn Fn(&World)>,
    access_mask: ComponentMask,
    write_mask: ComponentMask,
    /// Systems this one must run after.
    pub(crate) dependencies: Vec<usize>,
    /// Systems that must run after this one.
    pub(crate) dependents: Vec<usize>,
}

impl System {
    pub(crate) fn new(
        run: Box<dyn Fn(&World)>,
        access_mask: ComponentMask,
        write_mask: ComponentMask,
    ) -> Self {
        Self {
            run,
            access_mask,
            write_mask,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }

    /// Union of every component the system may touch.
    #[inline]
    pub fn access_mask(&self) -> &ComponentMask {
        &self.access_mask
    }

    /// Components the system may mutate.
    #[inline]
    pub fn write_mask(&self) -> &ComponentMask {
        &self.write_mask
    }

    #[inline]
    pub(crate) fn run(&self, world: &World) {
        (self.run)(world)
    }
}
