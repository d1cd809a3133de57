use bevy::math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Solid terrain plus one-way platforms for one room, at tile resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainMap {
    pub width: i32,
    pub height: i32,
    pub solid: Grid<bool>,
    pub platforms: Grid<bool>,
}

impl TerrainMap {
    pub fn new(width: i32, height: i32) -> TerrainMap {
        TerrainMap {
            width,
            height,
            solid: Grid::new(width, height, true),
            platforms: Grid::new(width, height, false),
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.solid.in_bounds(x, y)
    }

    pub fn xy_idx(&self, x: i32, y: i32) -> Option<usize> {
        self.solid.xy_idx(x, y)
    }

    /// Out-of-bounds tiles count as solid.
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.solid.get(x, y).unwrap_or(true)
    }

    pub fn is_platform(&self, x: i32, y: i32) -> bool {
        self.platforms.get(x, y).unwrap_or(false)
    }

    /// In bounds and not solid. Platform tiles are open: they are one-way.
    pub fn is_open(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && !self.is_solid(x, y)
    }

    /// Something a character can stand on.
    pub fn is_support(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && (self.is_solid(x, y) || self.is_platform(x, y))
    }

    pub fn tile_center(&self, pos: IVec2) -> Vec2 {
        pos.as_vec2() + Vec2::splat(0.5)
    }

    pub fn solid_count(&self) -> usize {
        self.solid.cells().iter().filter(|s| **s).count()
    }

    /// `#` solid, `=` platform, `.` open.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let glyph = if self.is_solid(x, y) {
                    '#'
                } else if self.is_platform(x, y) {
                    '='
                } else {
                    '.'
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}
