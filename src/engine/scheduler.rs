//! System scheduling.
//!
//! The [`Scheduler`] collects systems and explicit ordering edges, then
//! linearises them into a [`Schedule`]:
//!
//! 1. [`Scheduler::register_system`] wraps a function into a canonical
//!    [`System`] record and returns a [`SystemRef`] with no dependencies.
//! 2. [`Scheduler::execute_after`] adds one ordering edge. The edge is
//!    rejected fatally when it would close a cycle; the check runs before
//!    the edge is inserted, so the graph is a DAG at every point in time.
//! 3. [`Scheduler::build_schedule`] produces the execution order: an
//!    iterative depth-first traversal from every root over the `dependents`
//!    edges emits each system in post-order, and reversing that emission
//!    places every system after all of its dependencies.
//!
//! Execution is serial. Systems receive the world shared and construct their
//! declared queries from it; the per-system access and write masks remain
//! available for conflict analysis by an executor layered on top.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::query::{AccessSpec, Entity, Query};
use crate::engine::systems::System;
use crate::engine::world::World;
use crate::profiling::profiler;

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(0);

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a system registered with one particular [`Scheduler`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SystemRef {
    scheduler: u64,
    index: usize,
}

impl SystemRef {
    /// Returns the position of the system in its scheduler's registration
    /// order.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Collects systems and ordering edges and builds linear schedules.
pub struct Scheduler {
    id: u64,
    systems: Vec<System>,
    roots: Vec<usize>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
            systems: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Returns the number of registered systems.
    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` when no system has been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Returns the registered systems in registration order.
    #[inline]
    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    fn push_system(&mut self, system: System) -> SystemRef {
        let index = self.systems.len();
        self.systems.push(system);
        self.roots.push(index);
        SystemRef {
            scheduler: self.id,
            index,
        }
    }

    /// Registers a per-entity system.
    ///
    /// When the schedule runs, the system function is called once for every
    /// live entity whose mask contains the spec's access mask.
    pub fn register_system<S>(&mut self, system: for<'w> fn(Entity<'w, S>)) -> SystemRef
    where
        S: AccessSpec + 'static,
    {
        let access_mask = S::access_mask();
        let write_mask = S::write_mask();
        let run = Box::new(move |world: &World| {
            let entities = Query::<S>::new(world);
            for entity in &entities {
                system(entity);
            }
        });
        self.push_system(System::new(run, access_mask, write_mask))
    }

    /// Registers a per-entity system that also receives a secondary query.
    ///
    /// The query is resolved once per run and handed to every invocation, so
    /// a system can relate each entity to the full set matching the second
    /// spec. Both specs contribute to the system's masks.
    pub fn register_system_with_query<S, Q>(
        &mut self,
        system: for<'w, 'e, 'q> fn(Entity<'w, S>, &'e Query<'q, Q>),
    ) -> SystemRef
    where
        S: AccessSpec + 'static,
        Q: AccessSpec + 'static,
    {
        let access_mask = S::access_mask() | Q::access_mask();
        let write_mask = S::write_mask() | Q::write_mask();
        let run = Box::new(move |world: &World| {
            let query = Query::<Q>::new(world);
            let entities = Query::<S>::new(world);
            for entity in &entities {
                system(entity, &query);
            }
        });
        self.push_system(System::new(run, access_mask, write_mask))
    }

    /// Orders `system` after `dependency` and returns `system` for chaining.
    ///
    /// Both refs must come from this scheduler and must differ. The call is
    /// fatal when the new edge would close a dependency cycle; the check
    /// happens before anything is modified.
    pub fn execute_after(&mut self, system: SystemRef, dependency: SystemRef) -> SystemRef {
        assert_eq!(
            system.scheduler, self.id,
            "system ref belongs to another scheduler"
        );
        assert_eq!(
            dependency.scheduler, self.id,
            "dependency ref belongs to another scheduler"
        );
        assert_ne!(
            system.index, dependency.index,
            "a system cannot execute after itself"
        );
        assert!(
            !self.depends_on(dependency.index, system.index),
            "execute_after would create a dependency cycle"
        );

        self.systems[system.index].dependencies.push(dependency.index);
        self.systems[dependency.index].dependents.push(system.index);
        self.roots.retain(|&root| root != system.index);
        system
    }

    /// Returns `true` when `from` transitively depends on `to`.
    fn depends_on(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.systems.len()];
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if visited[node] {
                continue;
            }
            visited[node] = true;
            stack.extend_from_slice(&self.systems[node].dependencies);
        }
        false
    }

    /// Linearises the dependency DAG into an executable [`Schedule`].
    ///
    /// Every system appears exactly once and after all of its dependencies.
    /// Systems without edges keep no particular order beyond that.
    pub fn build_schedule(&self) -> Schedule<'_> {
        let mut visited = vec![false; self.systems.len()];
        let mut post_order = Vec::with_capacity(self.systems.len());

        for &root in &self.roots {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some(&(node, cursor)) = stack.last() {
                let dependents = &self.systems[node].dependents;
                if cursor < dependents.len() {
                    stack.last_mut().expect("stack is non-empty").1 += 1;
                    let next = dependents[cursor];
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, 0));
                    }
                } else {
                    // Emitted on the way out: a system surfaces only after
                    // everything reachable through its dependents did.
                    post_order.push(node);
                    stack.pop();
                }
            }
        }

        post_order.reverse();
        Schedule {
            steps: post_order
                .into_iter()
                .map(|index| &self.systems[index])
                .collect(),
        }
    }
}

/// A linearised execution order produced by [`Scheduler::build_schedule`].
pub struct Schedule<'s> {
    steps: Vec<&'s System>,
}

impl<'s> Schedule<'s> {
    /// Returns the number of scheduled systems.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` when the schedule contains no systems.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every system once, in order, against `world`.
    pub fn execute(&self, world: &World) {
        let _span = profiler::span("Schedule::execute")
            .arg("systems", profiler::Arg::U64(self.steps.len() as u64));
        for (index, system) in self.steps.iter().enumerate() {
            let _system_span =
                profiler::span("System::run").arg("step", profiler::Arg::U64(index as u64));
            system.run(world);
        }
    }
}
