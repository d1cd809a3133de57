use bevy::log::debug;
use bevy::math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::LevelConfig;
use crate::direction::Direction;
use crate::error::GenError;
use crate::rng::LevelRng;
use crate::shapes::Rect;

use super::{BuilderMap, MetaMapBuilder, TileIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortalKind {
    Entrance,
    Exit,
}

/// Where a corridor attaches to a room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortalAnchor {
    /// Center of the opening on the room's outer edge.
    pub point: Vec2,
    /// Facing, pointing out of the room.
    pub direction: Direction,
    pub stub: Vec2,
    pub approach: Vec2,
    pub kind: PortalKind,
    /// Carved tiles, room-local.
    pub opening: Rect,
}

impl PortalAnchor {
    pub fn translated(&self, offset: Vec2) -> PortalAnchor {
        PortalAnchor {
            point: self.point + offset,
            stub: self.stub + offset,
            approach: self.approach + offset,
            ..*self
        }
    }
}

// ============================================================================
// PortalCarving - cut the door openings through the frame and record anchors
// ============================================================================

pub struct PortalCarving {
    width: i32,
    depth: i32,
    stub_length: f32,
    approach_distance: f32,
}

impl PortalCarving {
    pub fn new(config: &LevelConfig) -> Box<Self> {
        let frame = config.cell.wall_thickness + config.cave.carve_max_depth;
        Box::new(Self {
            width: config.portal.entrance_width,
            depth: config.portal.entrance_height.max(frame),
            stub_length: config.portal.stub_length,
            approach_distance: config.portal.approach_distance,
        })
    }

    fn carve(&self, build_data: &mut BuilderMap, cell: IVec2, side: Direction, kind: PortalKind) -> PortalAnchor {
        let geo = build_data.geometry;
        let origin = geo.origin(cell);
        let x1 = origin.x + geo.center().x - self.width / 2;
        let (y1, edge_y) = match side {
            Direction::North => (origin.y, origin.y as f32),
            _ => (origin.y + geo.height - self.depth, (origin.y + geo.height) as f32),
        };

        let opening = Rect::new(x1, y1, self.width, self.depth);
        for y in opening.y1..opening.y2 {
            for x in opening.x1..opening.x2 {
                build_data.force(x, y, TileIntent::Open);
                build_data.map.platforms.set_clipped(x, y, false);
            }
        }

        let point = Vec2::new(x1 as f32 + self.width as f32 * 0.5, edge_y);
        PortalAnchor {
            point,
            direction: side,
            stub: point + side.unit() * self.stub_length,
            approach: point + side.unit() * self.approach_distance,
            kind,
            opening,
        }
    }
}

impl MetaMapBuilder for PortalCarving {
    fn build_map(&mut self, _rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        let entry = build_data.graph.entry();
        let exit = build_data.graph.exit();

        let entrance = self.carve(build_data, entry, Direction::North, PortalKind::Entrance);
        let exit = self.carve(build_data, exit, Direction::South, PortalKind::Exit);
        debug!(
            "room {}: entrance at {}, exit at {}",
            build_data.room_index, entrance.point, exit.point
        );

        build_data.portals = vec![entrance, exit];
        build_data.take_snapshot();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_builders::room_builder;
    use crate::map_builders::TerrainArchetypeMapper;
    use crate::room_graph::RoomGraphBuilder;

    #[test]
    fn anchors_sit_on_the_outer_edge_and_face_out() {
        let config = LevelConfig::default();
        let mut rng = LevelRng::seeded(42);
        let graph = RoomGraphBuilder::new(&config).build(&mut rng).unwrap();
        let archetypes = TerrainArchetypeMapper::new(&config).map(&graph, &mut rng);
        let mut chain = room_builder(&config, 0, graph, archetypes);
        chain.build_map(&mut rng).unwrap();
        let data = chain.into_build_data();

        assert_eq!(data.portals.len(), 2);
        let entrance = data.portals[0];
        let exit = data.portals[1];
        assert_eq!(entrance.kind, PortalKind::Entrance);
        assert_eq!(entrance.point.y, 0.0);
        assert_eq!(entrance.direction, Direction::North);
        assert!(entrance.approach.y < entrance.stub.y && entrance.stub.y < 0.0);
        assert_eq!(exit.point.y, data.map.height as f32);
        assert!(exit.approach.y > exit.stub.y);

        // the opening reaches through the whole frame
        for portal in [entrance, exit] {
            for y in portal.opening.y1..portal.opening.y2 {
                for x in portal.opening.x1..portal.opening.x2 {
                    assert!(data.map.is_open(x, y), "{x},{y}");
                }
            }
            assert_eq!(portal.opening.width(), config.portal.entrance_width);
        }
    }

    #[test]
    fn translation_keeps_the_opening() {
        let anchor = PortalAnchor {
            point: Vec2::new(10.0, 0.0),
            direction: Direction::North,
            stub: Vec2::new(10.0, -1.0),
            approach: Vec2::new(10.0, -3.0),
            kind: PortalKind::Entrance,
            opening: Rect::new(8, 0, 4, 6),
        };
        let moved = anchor.translated(Vec2::new(5.0, 7.0));
        assert_eq!(moved.point, Vec2::new(15.0, 7.0));
        assert_eq!(moved.approach, Vec2::new(15.0, 4.0));
        assert_eq!(moved.opening, anchor.opening);
    }
}
