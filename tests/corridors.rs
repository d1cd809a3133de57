use bevy::math::{IVec2, Rect, Vec2};
use rand::Rng;

use levelgen::config::PathfindingConfig;
use levelgen::direction::Direction;
use levelgen::map_builders::{PortalAnchor, PortalKind};
use levelgen::pathfinding::{is_axis_aligned, CorridorPathfinder};
use levelgen::rng::LevelRng;
use levelgen::shapes;

fn strictly_inside(r: &Rect, p: Vec2) -> bool {
    p.x > r.min.x && p.x < r.max.x && p.y > r.min.y && p.y < r.max.y
}

fn samples(points: &[Vec2]) -> Vec<Vec2> {
    let mut out = Vec::new();
    for w in points.windows(2) {
        let steps = (w[0].distance(w[1]) / 0.25).ceil().max(1.0) as usize;
        out.extend((0..=steps).map(|i| w[0].lerp(w[1], i as f32 / steps as f32)));
    }
    out
}

fn anchor(point: Vec2, direction: Direction, kind: PortalKind) -> PortalAnchor {
    PortalAnchor {
        point,
        direction,
        stub: point + direction.unit(),
        approach: point + direction.unit() * 3.0,
        kind,
        opening: shapes::Rect::new(0, 0, 4, 6),
    }
}

#[test]
fn two_rooms_with_a_two_tile_gap() {
    let room_a = Rect::new(4.0, 4.0, 24.0, 20.0);
    let room_b = Rect::new(26.0, 4.0, 46.0, 20.0);
    let finder = CorridorPathfinder::new(
        &PathfindingConfig::default(),
        Rect::new(0.0, 0.0, 50.0, 26.0),
        vec![room_a, room_b],
    );

    let exit = anchor(Vec2::new(14.0, 20.0), Direction::South, PortalKind::Exit);
    let entrance = anchor(Vec2::new(36.0, 4.0), Direction::North, PortalKind::Entrance);
    let path = finder.route(&exit, &entrance).unwrap();

    assert!(path.len() >= 3);
    assert_eq!(path.first(), Some(&exit.point));
    assert_eq!(path.last(), Some(&entrance.point));
    assert!(is_axis_aligned(&path), "{path:?}");
    // the stubs leave along the door axis
    assert_eq!(path[1].x, exit.point.x);
    assert_eq!(path[path.len() - 2].x, entrance.point.x);

    for p in samples(&path) {
        assert!(!strictly_inside(&room_a, p) && !strictly_inside(&room_b, p), "{p}");
    }
}

#[test]
fn query_between_approach_points_clears_the_margin() {
    let rooms = vec![
        Rect::new(4.0, 4.0, 24.0, 20.0),
        Rect::new(30.0, 0.0, 34.0, 22.0),
        Rect::new(40.0, 4.0, 56.0, 20.0),
    ];
    let config = PathfindingConfig::default();
    let finder = CorridorPathfinder::new(&config, Rect::new(0.0, 0.0, 60.0, 30.0), rooms.clone());

    let start = Vec2::new(14.0, 23.0);
    let end = Vec2::new(48.0, 1.0);
    let path = finder.query(start, end).unwrap();
    assert!(is_axis_aligned(&path));
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&end));

    let expanded: Vec<Rect> = rooms.iter().map(|r| r.inflate(config.obstacle_margin)).collect();
    for p in samples(&path) {
        for r in &expanded {
            assert!(!strictly_inside(r, p), "{p} inside {r:?}");
        }
    }
}

#[test]
fn walkable_grid_spot_checks() {
    let rooms = vec![
        Rect::new(6.0, 6.0, 102.0, 78.0),
        Rect::new(108.0, 6.0, 204.0, 78.0),
    ];
    let config = PathfindingConfig::default();
    let bounds = Rect::new(0.0, 0.0, 220.0, 100.0);
    let finder = CorridorPathfinder::new(&config, bounds, rooms.clone());
    let grid = finder.walkable();
    assert_eq!((grid.width(), grid.height()), (220, 100));

    let mut rng = LevelRng::seeded(2024);
    for _ in 0..500 {
        let cell = IVec2::new(rng.0.gen_range(0..grid.width()), rng.0.gen_range(0..grid.height()));
        let center = grid.cell_center(cell);
        let expected = bounds.contains(center)
            && !rooms
                .iter()
                .any(|r| r.inflate(config.obstacle_margin).contains(center));
        assert_eq!(grid.is_walkable(cell), expected, "{cell}");
    }
    // the gap between the rooms stays open, the rooms do not
    assert!(grid.is_walkable(IVec2::new(105, 40)));
    assert!(!grid.is_walkable(IVec2::new(50, 40)));
}

#[test]
fn unreachable_goal_returns_none() {
    // goal sealed inside a ring of obstacles
    let ring = vec![
        Rect::new(20.0, 10.0, 40.0, 12.0),
        Rect::new(20.0, 28.0, 40.0, 30.0),
        Rect::new(20.0, 10.0, 22.0, 30.0),
        Rect::new(38.0, 10.0, 40.0, 30.0),
    ];
    let finder = CorridorPathfinder::new(&PathfindingConfig::default(), Rect::new(0.0, 0.0, 60.0, 40.0), ring);
    assert!(finder.query(Vec2::new(5.0, 5.0), Vec2::new(30.0, 20.0)).is_none());
}
