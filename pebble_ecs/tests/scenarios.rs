use std::collections::HashSet;
use std::ops::ControlFlow;

use pebble_ecs::{Component, Entity, World, WorldConfig};

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Circle {
    size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Tag(u32);

fn pos(x: f32) -> Position {
    Position { x, y: 0.0 }
}

#[test]
fn detach_mid_scan_does_not_revisit() {
    let mut w = World::default();

    let e: Vec<Entity> = (0..5).map(|_| w.create()).collect();
    for (i, entity) in e.iter().enumerate() {
        w.attach(*entity, pos(i as f32));
    }
    for i in [0, 2, 4] {
        w.attach(e[i], Circle { size: 32.0 });
    }

    let mut visited = Vec::new();
    let mut view = w.view::<(Position, Circle)>();
    while let Some(entity) = view.next(&mut w) {
        visited.push(entity);
        if entity == e[2] {
            w.detach::<Circle>(entity);
        }
    }

    // Circle drives, backwards from E5
    assert_eq!(visited, vec![e[4], e[2], e[0]]);
    assert!(!w.has::<Circle>(e[2]));
    assert_eq!(w.pool_len::<Circle>(), 2);
    assert_eq!(w.iteration_depth(), 0);
}

#[test]
fn static_view_visits_intersection_in_reverse() {
    let mut w = World::default();

    let e: Vec<Entity> = (0..5).map(|_| w.create()).collect();
    for (i, entity) in e.iter().enumerate() {
        w.attach(*entity, pos(i as f32));
    }
    for i in [0, 2, 4] {
        w.attach(e[i], Circle { size: 32.0 });
    }

    let mut visited = Vec::new();
    w.scan::<(Position, Circle)>(|w, entity| {
        visited.push((entity, w.get::<Position>(entity).x));
        ControlFlow::Continue(())
    });

    assert_eq!(visited, vec![(e[4], 4.0), (e[2], 2.0), (e[0], 0.0)]);
}

#[test]
fn destroy_every_third_match() {
    let mut w = World::default();

    let mut expected_survivors = HashSet::new();
    let mut all = Vec::new();
    for i in 0..100u32 {
        let e = w.create();
        w.attach(e, Tag(i));
        if i % 4 != 0 {
            w.attach(e, pos(i as f32));
        }
        all.push(e);
    }

    let mut matched = 0;
    let mut seen = HashSet::new();
    w.scan::<(Tag, Position)>(|w, e| {
        assert!(seen.insert(e), "visited {} twice", e);
        if matched % 3 != 0 {
            expected_survivors.insert(e);
        } else {
            w.destroy(e);
        }
        matched += 1;
        ControlFlow::Continue(())
    });

    assert_eq!(matched, 75);
    assert_eq!(w.count(), 100 - 25);
    assert_eq!(w.pool_len::<Position>(), 50);

    let mut survivors = HashSet::new();
    w.scan::<(Tag, Position)>(|w, e| {
        assert_eq!(w.get::<Tag>(e).0 as f32, w.get::<Position>(e).x);
        survivors.insert(e);
        ControlFlow::Continue(())
    });
    assert_eq!(survivors, expected_survivors);

    // Entities without a Position were never touched
    for (i, e) in all.iter().enumerate() {
        if i % 4 == 0 {
            assert!(w.is_alive(*e));
        }
    }
}

#[test]
fn spawn_during_scan_keeps_everything() {
    // Doubling both pools past 32 retires three buffers each
    let mut w = World::with_config(WorldConfig {
        reclaim_capacity: 8,
        ..WorldConfig::default()
    });

    for i in 0..20 {
        w.spawn().with(Tag(i)).with(pos(i as f32));
    }

    let mut visited = 0;
    let mut most_pending = 0;
    w.scan::<(Tag, Position)>(|w, e| {
        let x = w.get::<Position>(e).x;
        w.spawn().with(Tag(1000)).with(pos(x));
        visited += 1;
        most_pending = most_pending.max(w.pending_reclaims());
        ControlFlow::Continue(())
    });

    assert_eq!(visited, 20);
    assert_eq!(most_pending, 6);
    assert_eq!(w.pool_len::<Tag>(), 40);
    assert_eq!(w.pending_reclaims(), 0);
}

#[test]
fn sparse_set_stays_consistent() {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let mut w = World::default();
    let mut live: Vec<(Entity, Option<u32>)> = Vec::new();

    for step in 0..3000u32 {
        match rng.gen_range(0..4) {
            0 => live.push((w.create(), None)),
            1 if !live.is_empty() => {
                let idx = rng.gen_range(0..live.len());
                let (e, tag) = &mut live[idx];
                match tag {
                    Some(_) => {
                        w.detach::<Tag>(*e);
                        *tag = None;
                    }
                    None => {
                        w.attach(*e, Tag(step));
                        *tag = Some(step);
                    }
                }
            }
            2 if !live.is_empty() => {
                let (e, _) = live.swap_remove(rng.gen_range(0..live.len()));
                w.destroy(e);
            }
            _ => {
                w.compact().unwrap();
            }
        }

        if step % 100 == 0 {
            let with_tag = live.iter().filter(|(_, tag)| tag.is_some()).count();
            assert_eq!(w.pool_len::<Tag>(), with_tag);
            for (e, tag) in &live {
                assert_eq!(w.has::<Tag>(*e), tag.is_some());
                if let Some(tag) = tag {
                    assert_eq!(w.get::<Tag>(*e).0, *tag);
                }
            }
        }
    }
}

#[test]
fn compaction_is_idempotent() {
    let mut w = World::default();

    let entities: Vec<Entity> = (0..300).map(|i| w.spawn().with(Tag(i)).entity()).collect();
    for e in &entities[..250] {
        w.destroy(*e);
    }

    assert!(w.compact().unwrap() > 0);
    let capacity = w.pool_capacity::<Tag>();
    assert_eq!(capacity, 56);

    assert_eq!(w.compact().unwrap(), 0);
    assert_eq!(w.pool_capacity::<Tag>(), capacity);

    for (i, e) in entities[250..].iter().enumerate() {
        assert_eq!(w.get::<Tag>(*e), &Tag(250 + i as u32));
    }
}

#[test]
fn compaction_during_scan_is_deferred() {
    let mut w = World::default();

    let entities: Vec<Entity> = (0..64).map(|i| w.spawn().with(Tag(i)).entity()).collect();
    for e in &entities[10..] {
        w.destroy(*e);
    }

    let mut view = w.view::<(Tag,)>();
    view.next(&mut w);
    assert_eq!(w.compact().unwrap(), 1);
    assert!(w.pending_reclaims() > 0);

    while view.next(&mut w).is_some() {}
    assert_eq!(w.pending_reclaims(), 0);
}
