use std::f32::consts::TAU;

use bevy::log::debug;
use bevy::math::IVec2;
use rand::Rng;

use crate::config::{CaveConfig, LevelConfig};
use crate::direction::Direction;
use crate::error::GenError;
use crate::rng::LevelRng;

use super::{BuilderMap, MetaMapBuilder, TileIntent};

// ============================================================================
// BoundaryCarving - solid frame around the room with an uneven inner face
// ============================================================================

pub struct BoundaryCarving {
    wall_thickness: i32,
    max_depth: i32,
    min_wavelength: f32,
    max_wavelength: f32,
}

/// One side of a valid cell that faces outside the room.
struct EdgeSegment {
    cell: IVec2,
    side: Direction,
}

impl BoundaryCarving {
    pub fn new(config: &LevelConfig) -> Box<Self> {
        Box::new(Self {
            wall_thickness: config.cell.wall_thickness,
            max_depth: config.cave.carve_max_depth,
            min_wavelength: config.cave.carve_min_wavelength,
            max_wavelength: config.cave.carve_max_wavelength,
        })
    }

    fn frame(&self) -> i32 {
        self.wall_thickness + self.max_depth
    }

    fn perimeter(build_data: &BuilderMap) -> Vec<EdgeSegment> {
        let mut segments = Vec::new();
        for node in build_data.graph.nodes() {
            for side in Direction::ALL {
                if !build_data.graph.is_valid(node.pos + side.offset()) {
                    segments.push(EdgeSegment {
                        cell: node.pos,
                        side,
                    });
                }
            }
        }
        segments
    }

    /// Tile `k` steps in from the segment's outer edge, `t` along it.
    fn inward_tile(build_data: &BuilderMap, segment: &EdgeSegment, t: i32, k: i32) -> IVec2 {
        let geo = build_data.geometry;
        let o = geo.origin(segment.cell);
        match segment.side {
            Direction::North => IVec2::new(o.x + t, o.y + k),
            Direction::South => IVec2::new(o.x + t, o.y + geo.height - 1 - k),
            Direction::West => IVec2::new(o.x + k, o.y + t),
            Direction::East => IVec2::new(o.x + geo.width - 1 - k, o.y + t),
        }
    }

    fn carve_segment(&self, rng: &mut LevelRng, build_data: &mut BuilderMap, segment: &EdgeSegment) {
        let length = if segment.side.is_vertical() {
            build_data.geometry.width
        } else {
            build_data.geometry.height
        };
        let phase = rng.0.gen_range(0.0..TAU);
        let wavelength = if self.max_wavelength > self.min_wavelength {
            rng.0.gen_range(self.min_wavelength..self.max_wavelength)
        } else {
            self.min_wavelength
        };
        let frame = self.frame();

        for t in 0..length {
            let wave = 0.5 + 0.5 * (TAU * t as f32 / wavelength + phase).sin();
            let jitter = rng.0.gen_range(-1..=1);
            let depth = ((self.max_depth as f32 * wave).round() as i32 + jitter).clamp(0, self.max_depth);

            for k in 0..frame {
                let tile = Self::inward_tile(build_data, segment, t, k);
                if k < frame - depth {
                    build_data.force(tile.x, tile.y, TileIntent::Wall);
                } else if build_data.intent.at(tile) == Some(TileIntent::Cave) {
                    build_data.map.solid.set_clipped(tile.x, tile.y, false);
                }
            }
        }
    }
}

impl MetaMapBuilder for BoundaryCarving {
    fn build_map(&mut self, rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        let segments = Self::perimeter(build_data);
        for segment in &segments {
            self.carve_segment(rng, build_data, segment);
        }

        // The reserved band follows the whole region outline, inner corners included.
        for y in 0..build_data.map.height {
            for x in 0..build_data.map.width {
                let d = build_data.edge_distance.get(x, y).unwrap_or(-1);
                if d >= 0 && d < self.wall_thickness {
                    build_data.force(x, y, TileIntent::Wall);
                }
            }
        }

        debug!(
            "room {}: carved {} boundary segments",
            build_data.room_index,
            segments.len()
        );
        build_data.take_snapshot();
        Ok(())
    }
}

// ============================================================================
// ConnectionClearing - safety footprint across every connected cell boundary
// ============================================================================

pub struct ConnectionClearing {
    width: i32,
    height: i32,
}

impl ConnectionClearing {
    pub fn new(cave: &CaveConfig) -> Box<Self> {
        Box::new(Self {
            width: cave.safety_footprint_width,
            height: cave.safety_footprint_height,
        })
    }
}

impl MetaMapBuilder for ConnectionClearing {
    fn build_map(&mut self, _rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        let geo = build_data.geometry;
        let (_, band_bottom) = geo.band_rows();

        for (cell, side) in build_data.graph.connection_pairs() {
            let origin = geo.origin(cell);
            let (x1, y1) = match side {
                Direction::East => {
                    let boundary = origin.x + geo.width;
                    (boundary - self.width / 2, origin.y + band_bottom - self.height)
                }
                Direction::South => {
                    let boundary = origin.y + geo.height;
                    (origin.x + geo.center().x - self.width / 2, boundary - self.height / 2)
                }
                _ => continue,
            };
            for y in y1..y1 + self.height {
                for x in x1..x1 + self.width {
                    build_data.force(x, y, TileIntent::Open);
                }
            }
        }

        build_data.take_snapshot();
        Ok(())
    }
}
