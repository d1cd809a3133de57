use bevy::math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Half-open tile rectangle: covers `x1..x2` by `y1..y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect {
            x1: x,
            y1: y,
            x2: x + w,
            y2: y + h,
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn intersect(&self, other: &Rect) -> bool {
        self.x1 < other.x2 && self.x2 > other.x1 && self.y1 < other.y2 && self.y2 > other.y1
    }

    pub fn contains(&self, pos: IVec2) -> bool {
        pos.x >= self.x1 && pos.x < self.x2 && pos.y >= self.y1 && pos.y < self.y2
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// Geometric center in continuous tile units.
    pub fn center_f32(&self) -> Vec2 {
        Vec2::new(
            (self.x1 + self.x2) as f32 * 0.5,
            (self.y1 + self.y2) as f32 * 0.5,
        )
    }

    pub fn to_world(&self, origin: Vec2) -> bevy::math::Rect {
        bevy::math::Rect::new(
            origin.x + self.x1 as f32,
            origin.y + self.y1 as f32,
            origin.x + self.x2 as f32,
            origin.y + self.y2 as f32,
        )
    }
}
