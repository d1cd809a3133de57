use bevy::math::IVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("grid position ({x}, {y}) outside {width}x{height}")]
pub struct GridError {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Row-major 2D store with explicit dimensions.
///
/// Reads outside the grid return `None`; writes outside the grid return a
/// [`GridError`] instead of indexing out of range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(width: i32, height: i32, fill: T) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            cells: vec![fill; (width * height) as usize],
        }
    }

    pub fn fill(&mut self, value: T) {
        for cell in self.cells.iter_mut() {
            *cell = value.clone();
        }
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    pub fn xy_idx(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| (y as usize * self.width as usize) + x as usize)
    }

    pub fn idx_xy(&self, idx: usize) -> IVec2 {
        let w = self.width.max(1) as usize;
        IVec2::new((idx % w) as i32, (idx / w) as i32)
    }

    pub fn get_ref(&self, x: i32, y: i32) -> Option<&T> {
        self.xy_idx(x, y).map(|idx| &self.cells[idx])
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut T> {
        self.xy_idx(x, y).map(move |idx| &mut self.cells[idx])
    }

    pub fn set(&mut self, x: i32, y: i32, value: T) -> Result<(), GridError> {
        match self.xy_idx(x, y) {
            Some(idx) => {
                self.cells[idx] = value;
                Ok(())
            }
            None => Err(GridError {
                x,
                y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    /// Writes only when in bounds. For painters that clip shapes against the grid edge.
    pub fn set_clipped(&mut self, x: i32, y: i32, value: T) {
        if let Some(idx) = self.xy_idx(x, y) {
            self.cells[idx] = value;
        }
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &T)> {
        let w = self.width.max(1) as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, cell)| (IVec2::new((idx % w) as i32, (idx / w) as i32), cell))
    }
}

impl<T: Copy> Grid<T> {
    pub fn get(&self, x: i32, y: i32) -> Option<T> {
        self.xy_idx(x, y).map(|idx| self.cells[idx])
    }

    pub fn at(&self, pos: IVec2) -> Option<T> {
        self.get(pos.x, pos.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_are_none() {
        let grid = Grid::new(3, 2, 0u8);
        assert_eq!(grid.get(2, 1), Some(0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, -1), None);
    }

    #[test]
    fn out_of_range_writes_fail() {
        let mut grid = Grid::new(3, 2, false);
        assert!(grid.set(1, 1, true).is_ok());
        assert_eq!(grid.get(1, 1), Some(true));

        let err = grid.set(-1, 0, true).unwrap_err();
        assert_eq!(err.width, 3);
        assert_eq!(err.x, -1);
    }

    #[test]
    fn index_round_trips_through_position() {
        let grid = Grid::new(5, 4, 0u8);
        let idx = grid.xy_idx(3, 2).unwrap();
        assert_eq!(idx, 13);
        assert_eq!(grid.idx_xy(idx), IVec2::new(3, 2));
    }
}
