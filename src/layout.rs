use bevy::math::{IVec2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::LevelConfig;
use crate::error::GenError;

/// Where each room sits in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub bounds: Rect,
    pub room_size: Vec2,
    pub columns: usize,
    pub rows: usize,
    pub origins: Vec<Vec2>,
}

impl LevelLayout {
    /// Rooms left to right, wrapping into rows, `room_spacing` apart and from the bounds.
    pub fn plan(config: &LevelConfig) -> Result<LevelLayout, GenError> {
        let layout = &config.layout;
        let room_size = config.room_tile_size().as_vec2();
        let spacing = layout.room_spacing;
        let count = layout.room_count;

        let fit = |available: f32, size: f32| ((available - spacing) / (size + spacing)).floor().max(0.0) as usize;
        let columns = fit(layout.bounds_width, room_size.x);
        let rows = fit(layout.bounds_height, room_size.y);

        if columns * rows < count {
            let wanted_columns = count.max(1).min(columns.max(1));
            let wanted_rows = count.div_ceil(wanted_columns);
            return Err(GenError::LayoutInfeasible {
                room_count: count,
                required_width: spacing + wanted_columns as f32 * (room_size.x + spacing),
                required_height: spacing + wanted_rows as f32 * (room_size.y + spacing),
                available_width: layout.bounds_width,
                available_height: layout.bounds_height,
            });
        }

        let origins = (0..count)
            .map(|i| {
                let cell = IVec2::new((i % columns) as i32, (i / columns) as i32);
                Vec2::splat(spacing) + cell.as_vec2() * (room_size + spacing)
            })
            .collect();

        Ok(LevelLayout {
            bounds: Rect::new(0.0, 0.0, layout.bounds_width, layout.bounds_height),
            room_size,
            columns,
            rows,
            origins,
        })
    }

    pub fn room_rect(&self, index: usize) -> Option<Rect> {
        self.origins
            .get(index)
            .map(|origin| Rect::from_corners(*origin, *origin + self.room_size))
    }

    pub fn room_rects(&self) -> Vec<Rect> {
        (0..self.origins.len())
            .filter_map(|i| self.room_rect(i))
            .collect()
    }
}
