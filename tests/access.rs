use corral::{ComponentMask, Entity, Query, Read, With, World, Write};

#[derive(Clone, Copy)]
struct Transform {
    trfn: [f32; 12],
}

#[derive(Clone, Copy)]
struct Health {
    health: f32,
}

#[derive(Clone, Copy)]
struct Character;

#[derive(Clone, Copy)]
struct DamageSource {
    #[allow(dead_code)]
    position: [f32; 3],
    damage_over_time: f32,
}

type DamagedCharacterSpec = (Read<Transform>, Write<Health>, With<Character>);
type DamagedCharacterEntity<'w> = Entity<'w, DamagedCharacterSpec>;
type DamagedCharacterQuery<'w> = Query<'w, DamagedCharacterSpec>;

type DamageSourceSpec = (Read<DamageSource>, Read<Transform>);
type DamageSourceQuery<'w> = Query<'w, DamageSourceSpec>;

fn transform(x: f32, y: f32, z: f32) -> Transform {
    let mut trfn = [0.0; 12];
    trfn[0] = x;
    trfn[1] = y;
    trfn[2] = z;
    Transform { trfn }
}

#[test]
fn entity_views_read_and_write_by_grant() {
    let mut world = World::new();
    let e0 = world.add_entity();
    world.add_component(e0, transform(1.0, 2.0, 3.0));
    world.add_component(e0, Health { health: 99.0 });
    world.add_component(e0, Character);

    let mut damaged = DamagedCharacterEntity::new(&world, e0);
    let trfn = damaged.get::<Transform, _>();
    assert_eq!(trfn.trfn[0], 1.0);
    assert_eq!(trfn.trfn[1], 2.0);
    assert_eq!(trfn.trfn[2], 3.0);
    // A Write grant also licenses reads, through the mutable accessor.
    assert_eq!(damaged.get_mut::<Health, _>().health, 99.0);

    damaged.get_mut::<Health, _>().health -= 9.0;
    assert_eq!(world.get_component::<Health>(e0).health, 90.0);
}

#[test]
fn access_masks_cover_the_declared_triple() {
    let mut reference = ComponentMask::new();
    reference.set_type::<Transform>();
    reference.set_type::<Health>();
    reference.set_type::<Character>();
    assert_eq!(DamagedCharacterEntity::access_mask(), reference);
    assert_eq!(DamagedCharacterQuery::access_mask(), reference);

    let mut writes = ComponentMask::new();
    writes.set_type::<Health>();
    assert_eq!(DamagedCharacterEntity::write_mask(), writes);
    assert_eq!(DamagedCharacterQuery::write_mask(), writes);

    let mut source_reference = ComponentMask::new();
    source_reference.set_type::<DamageSource>();
    source_reference.set_type::<Transform>();
    assert_eq!(DamageSourceQuery::access_mask(), source_reference);
    assert_eq!(DamageSourceQuery::write_mask(), ComponentMask::new());
}

#[test]
fn queries_iterate_matching_entities() {
    let mut world = World::new();

    for (x, dot) in [(1.0, 99.0), (10.0, 9_900.0), (100.0, 990_000.0)] {
        let e = world.add_entity();
        world.add_component(e, transform(x, 2.0 * x, 3.0 * x));
        world.add_component(
            e,
            DamageSource {
                position: [0.0; 3],
                damage_over_time: dot,
            },
        );
    }

    let query = DamageSourceQuery::new(&world);
    assert_eq!(query.iter().count(), 3);

    let mut trfn_sum = [0.0f32; 3];
    let mut dot_sum = 0.0f32;
    for entity in &query {
        let trfn = entity.get::<Transform, _>();
        trfn_sum[0] += trfn.trfn[0];
        trfn_sum[1] += trfn.trfn[1];
        trfn_sum[2] += trfn.trfn[2];
        dot_sum += entity.get::<DamageSource, _>().damage_over_time;
    }
    assert_eq!(trfn_sum, [111.0, 222.0, 333.0]);
    assert_eq!(dot_sum, 999_999.0);
}

#[test]
fn with_grants_filter_without_data_access() {
    let mut world = World::new();

    let tagged = world.add_entity();
    world.add_component(tagged, transform(1.0, 0.0, 0.0));
    world.add_component(tagged, Health { health: 10.0 });
    world.add_component(tagged, Character);

    let untagged = world.add_entity();
    world.add_component(untagged, transform(2.0, 0.0, 0.0));
    world.add_component(untagged, Health { health: 20.0 });

    let ids: Vec<_> = DamagedCharacterQuery::new(&world)
        .iter()
        .map(|entity| entity.id())
        .collect();
    assert_eq!(ids, vec![tagged]);
}

#[test]
fn views_stay_usable_after_iterator_advances() {
    let mut world = World::new();
    for x in [1.0, 2.0] {
        let e = world.add_entity();
        world.add_component(e, transform(x, 0.0, 0.0));
        world.add_component(
            e,
            DamageSource {
                position: [0.0; 3],
                damage_over_time: 0.0,
            },
        );
    }

    let query = DamageSourceQuery::new(&world);
    let views: Vec<_> = query.iter().collect();
    // Views are by-value copies; collecting them does not invalidate any.
    let sum: f32 = views
        .iter()
        .map(|entity| entity.get::<Transform, _>().trfn[0])
        .sum();
    assert_eq!(sum, 3.0);
}

#[test]
#[should_panic(expected = "The entity is missing this component")]
fn reading_an_absent_component_is_fatal() {
    let mut world = World::new();
    let e = world.add_entity();
    world.add_component(e, transform(0.0, 0.0, 0.0));

    // The view's grant allows reading Health, but this entity's archetype
    // does not carry it.
    let view = Entity::<Read<Health>>::new(&world, e);
    let _ = view.get::<Health, _>();
}
