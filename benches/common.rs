#![allow(dead_code)]

use corral::prelude::*;

pub const AGENTS_SMALL: usize = 10_000;
pub const AGENTS_MED: usize = 100_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy)]
pub struct Wealth {
    pub value: f32,
}

/// Spawns `count` entities; every other one additionally carries `Wealth`,
/// so iteration spans two archetypes.
pub fn populate(world: &mut World, count: usize) -> Vec<EntityId> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let e = world.add_entity();
        world.add_component(
            e,
            Position {
                x: i as f32,
                y: 0.0,
            },
        );
        world.add_component(e, Velocity { dx: 1.0, dy: 0.5 });
        if i % 2 == 0 {
            world.add_component(e, Wealth { value: 10.0 });
        }
        ids.push(e);
    }
    ids
}
