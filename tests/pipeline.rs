use bevy::math::IVec2;

use levelgen::direction::Direction;
use levelgen::map_builders::{CellGeometry, PlatformAccessibilityVerifier, PortalKind};
use levelgen::pathfinding::is_axis_aligned;
use levelgen::room_graph::RoomRole;
use levelgen::spawn::SpawnExitLocator;
use levelgen::{generate, GenError, GenWarning, GenerationStrategy, GeneratedRoom, LevelConfig};

fn seeded(seed: u64) -> LevelConfig {
    LevelConfig {
        seed,
        ..Default::default()
    }
}

/// Valid tiles with an 8-neighbour outside the valid region.
fn perimeter(room: &GeneratedRoom, geometry: &CellGeometry) -> Vec<IVec2> {
    let valid = |p: IVec2| room.map.in_bounds(p.x, p.y) && room.graph.is_valid(geometry.cell_of(p));
    let mut tiles = Vec::new();
    for y in 0..room.map.height {
        for x in 0..room.map.width {
            let p = IVec2::new(x, y);
            if !valid(p) {
                continue;
            }
            let touches_outside = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| IVec2::new(dx, dy)))
                .any(|d| !valid(p + d));
            if touches_outside {
                tiles.push(p);
            }
        }
    }
    tiles
}

#[test]
fn same_seed_same_level() {
    for strategy in [GenerationStrategy::Archetype, GenerationStrategy::DensityOnly] {
        let mut config = seeded(1234);
        config.strategy = strategy;
        let a = generate(&config).unwrap();
        let b = generate(&config).unwrap();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }
}

#[test]
fn different_seeds_differ() {
    let a = generate(&seeded(1)).unwrap();
    let b = generate(&seeded(2)).unwrap();
    assert_ne!(a.rooms[0].map, b.rooms[0].map);
}

#[test]
fn seed_42_scenario() {
    let mut config = seeded(42);
    config.cave.fill_density = 0.5;
    let level = generate(&config).unwrap();
    assert_eq!(level.seed, 42);

    for room in &level.rooms {
        let graph = &room.graph;
        assert_eq!((graph.width(), graph.height()), (4, 4));
        let path = graph.critical_path();
        assert!((4..=10).contains(&path.len()), "path of {}", path.len());
        assert_eq!(graph.entry().y, 0);
        assert_eq!(graph.exit().y, 3);

        let roles: Vec<RoomRole> = graph.nodes().map(|n| n.role).collect();
        assert_eq!(roles.iter().filter(|r| **r == RoomRole::Entry).count(), 1);
        assert_eq!(roles.iter().filter(|r| **r == RoomRole::Exit).count(), 1);

        for pair in path.windows(2) {
            assert!(graph.connected(pair[0], pair[1]));
        }
        let mut unique = path.to_vec();
        unique.sort_by_key(|p| (p.y, p.x));
        unique.dedup();
        assert_eq!(unique.len(), path.len(), "path revisits a cell");
    }
}

#[test]
fn rooms_are_enclosed_except_at_portals() {
    for seed in [3, 17, 99] {
        let mut config = seeded(seed);
        config.grid.disabled_cells = vec![(1, 2)];
        let level = generate(&config).unwrap();
        let geometry = CellGeometry::from_config(&config.cell);

        for room in &level.rooms {
            for tile in perimeter(room, &geometry) {
                let in_portal = room.portals.iter().any(|p| p.opening.contains(tile));
                assert!(
                    in_portal || room.map.is_solid(tile.x, tile.y),
                    "seed {seed} room {}: perimeter tile {tile} is open",
                    room.index
                );
            }
            for portal in &room.portals {
                let edge = match portal.direction {
                    Direction::North => portal.opening.y1,
                    _ => portal.opening.y2 - 1,
                };
                assert!(room.map.is_open(portal.opening.x1, edge));
            }
        }
    }
}

#[test]
fn corridors_are_axis_aligned_and_avoid_rooms() {
    for seed in [5, 6, 7, 8] {
        let level = generate(&seeded(seed)).unwrap();
        assert_eq!(level.corridors.len(), level.rooms.len() - 1, "seed {seed}");

        let rects: Vec<_> = level.rooms.iter().map(|r| r.bounds()).collect();
        for corridor in &level.corridors {
            assert!(corridor.points.len() >= 2);
            assert!(is_axis_aligned(&corridor.points), "seed {seed}: {:?}", corridor.points);

            let exit = &level.portals[corridor.from_room * 2 + 1];
            let entrance = &level.portals[corridor.to_room * 2];
            assert_eq!(exit.kind, PortalKind::Exit);
            assert_eq!(entrance.kind, PortalKind::Entrance);
            assert_eq!(corridor.points.first(), Some(&exit.point));
            assert_eq!(corridor.points.last(), Some(&entrance.point));

            for w in corridor.points.windows(2) {
                let steps = (w[0].distance(w[1]) / 0.25).ceil().max(1.0) as usize;
                for i in 0..=steps {
                    let p = w[0].lerp(w[1], i as f32 / steps as f32);
                    for r in &rects {
                        let inside = p.x > r.min.x && p.x < r.max.x && p.y > r.min.y && p.y < r.max.y;
                        assert!(!inside, "seed {seed}: corridor point {p} inside room");
                    }
                }
            }
        }
    }
}

#[test]
fn verified_rooms_have_no_unreachable_clusters() {
    for seed in [11, 12, 13, 14] {
        let config = seeded(seed);
        let level = generate(&config).unwrap();
        let verifier = PlatformAccessibilityVerifier::new(&config);

        for room in &level.rooms {
            let warned = level.warnings.iter().any(|w| {
                matches!(w, GenWarning::AccessibilityUnresolvable { room: r, .. } if *r == room.index)
            });
            if !warned {
                let left = verifier.unreachable_clusters(&room.map, &room.portals);
                assert!(left.is_empty(), "seed {seed} room {}: {left:?}", room.index);
            }
        }
    }
}

#[test]
fn spawn_and_exit_are_standable_and_in_their_cells() {
    for strategy in [GenerationStrategy::Archetype, GenerationStrategy::DensityOnly] {
        for seed in [21, 22, 23, 42] {
            let mut config = seeded(seed);
            config.strategy = strategy;
            let level = generate(&config).unwrap();
            let geometry = CellGeometry::from_config(&config.cell);
            let locator = SpawnExitLocator::new(&config.spawn);

            let fell_back: Vec<_> = level
                .warnings
                .iter()
                .filter(|w| matches!(w, GenWarning::NoStandablePoint { .. }))
                .collect();
            assert!(fell_back.is_empty(), "{strategy:?} seed {seed}: {fell_back:?}");

            let checks = [
                (level.rooms.first().unwrap(), level.spawn_point, PortalKind::Entrance),
                (level.rooms.last().unwrap(), level.exit_point, PortalKind::Exit),
            ];
            for (room, point, kind) in checks {
                let tile = (point - room.origin).floor().as_ivec2();
                let cell = match kind {
                    PortalKind::Entrance => room.graph.entry(),
                    PortalKind::Exit => room.graph.exit(),
                };
                assert!(geometry.cell_rect(cell).contains(tile));
                assert!(
                    locator.is_standable(&room.map, tile),
                    "{strategy:?} seed {seed}: {tile}"
                );
            }
        }
    }
}

#[test]
fn platforms_never_sit_inside_solid_terrain() {
    for strategy in [GenerationStrategy::Archetype, GenerationStrategy::DensityOnly] {
        for seed in 1..=12 {
            let mut config = seeded(seed);
            config.strategy = strategy;
            let level = generate(&config).unwrap();
            for room in &level.rooms {
                for (pos, platform) in room.map.platforms.iter() {
                    assert!(
                        !(*platform && room.map.is_solid(pos.x, pos.y)),
                        "{strategy:?} seed {seed} room {}: {pos}",
                        room.index
                    );
                }
            }
        }
    }
}

#[test]
fn bfs_distance_is_monotone_in_generated_rooms() {
    let config = seeded(31);
    let level = generate(&config).unwrap();
    let geometry = CellGeometry::from_config(&config.cell);
    let room = &level.rooms[0];
    let region = geometry.cell_rect(room.graph.entry());
    let anchor = room.portal(PortalKind::Entrance).unwrap().point.floor().as_ivec2();
    let start = SpawnExitLocator::nearest_open(&room.map, &region, anchor.clamp(
        IVec2::new(region.x1, region.y1),
        IVec2::new(region.x2 - 1, region.y2 - 1),
    ))
    .unwrap();
    let dist = SpawnExitLocator::distances(&room.map, &region, start);

    assert_eq!(dist.at(start), Some(Some(0)));
    for (pos, d) in dist.iter() {
        let Some(d) = d else { continue };
        assert!(region.contains(pos));
        if *d > 0 {
            let has_parent = Direction::ALL
                .into_iter()
                .any(|dir| dist.at(pos + dir.offset()) == Some(Some(d - 1)));
            assert!(has_parent, "{pos} at {d} has no predecessor");
        }
        for dir in Direction::ALL {
            if let Some(Some(n)) = dist.at(pos + dir.offset()) {
                assert!(n.abs_diff(*d) <= 1);
            }
        }
    }
}

#[test]
fn infeasible_layout_is_an_error() {
    let mut config = seeded(1);
    config.layout.room_count = 5;
    assert!(matches!(
        generate(&config),
        Err(GenError::LayoutInfeasible { room_count: 5, .. })
    ));
}

#[test]
fn config_round_trips_through_json() {
    let mut config = seeded(9);
    config.grid.disabled_cells = vec![(0, 1)];
    config.strategy = GenerationStrategy::DensityOnly;
    let text = config.to_json().unwrap();
    let back: LevelConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}
