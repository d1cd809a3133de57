use bevy::log::debug;
use bevy::math::IVec2;

use crate::config::{LevelConfig, StairConfig};
use crate::direction::{Direction, DirectionSet};
use crate::error::GenError;
use crate::grid::Grid;
use crate::rng::LevelRng;

use super::{BuilderMap, CellGeometry, InitialMapBuilder, TerrainArchetype, TileIntent};

/// Tile intents and platform positions for one grid cell, in cell-local tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub intent: Grid<TileIntent>,
    pub platforms: Vec<IVec2>,
}

impl Chunk {
    pub fn filled(geometry: &CellGeometry, intent: TileIntent) -> Chunk {
        Chunk {
            intent: Grid::new(geometry.width, geometry.height, intent),
            platforms: Vec::new(),
        }
    }

    fn set(&mut self, x: i32, y: i32, intent: TileIntent) {
        self.intent.set_clipped(x, y, intent);
    }

    fn fill_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, intent: TileIntent) {
        for y in y1..y2 {
            for x in x1..x2 {
                self.set(x, y, intent);
            }
        }
    }

    /// Turns cave material into wall, leaving open tiles alone.
    fn harden(&mut self, x: i32, y: i32) {
        if self.intent.get(x, y) == Some(TileIntent::Cave) {
            self.set(x, y, TileIntent::Wall);
        }
    }

    fn add_platform(&mut self, x1: i32, x2: i32, y: i32) {
        for x in x1..x2 {
            let pos = IVec2::new(x, y);
            if self.intent.at(pos) == Some(TileIntent::Open) && !self.platforms.contains(&pos) {
                self.platforms.push(pos);
            }
        }
    }

    /// Writes the chunk into the room at the given grid cell.
    pub fn stamp(&self, build_data: &mut BuilderMap, cell: IVec2) -> Result<(), GenError> {
        let origin = build_data.geometry.origin(cell);
        for (pos, intent) in self.intent.iter() {
            let tile = origin + pos;
            build_data.force(tile.x, tile.y, *intent);
        }
        for pos in &self.platforms {
            let tile = origin + *pos;
            build_data.map.platforms.set(tile.x, tile.y, true)?;
        }
        Ok(())
    }
}

/// Closed-form fill of one cell. Not random: the same archetype and open sides always
/// give the same chunk.
pub fn rasterize_chunk(
    archetype: TerrainArchetype,
    open_sides: DirectionSet,
    geometry: &CellGeometry,
    stairs: &StairConfig,
) -> Chunk {
    let mut chunk = Chunk::filled(geometry, TileIntent::Cave);
    let w = geometry.width;
    let h = geometry.height;
    let (r0, r1) = geometry.band_rows();
    let (c0, c1) = geometry.band_cols();

    match archetype {
        TerrainArchetype::Solid => chunk.intent.fill(TileIntent::Wall),
        TerrainArchetype::Open => {
            chunk.intent.fill(TileIntent::Open);
            chunk.fill_rect(0, h - 1, w, h, TileIntent::Cave);
        }
        TerrainArchetype::Corridor => horizontal_band(&mut chunk, geometry, 0, w),
        TerrainArchetype::Shaft => {
            vertical_band(&mut chunk, geometry, 0, h);
            shaft_ledges(&mut chunk, geometry, stairs);
        }
        TerrainArchetype::CornerNorthEast
        | TerrainArchetype::CornerNorthWest
        | TerrainArchetype::CornerSouthEast
        | TerrainArchetype::CornerSouthWest => corner(&mut chunk, archetype, geometry),
        TerrainArchetype::StairsAscendingEast => staircase(&mut chunk, geometry, stairs, true),
        TerrainArchetype::StairsAscendingWest => staircase(&mut chunk, geometry, stairs, false),
        TerrainArchetype::MountainBase => mountain(&mut chunk, geometry, h / 2, w / 2),
        TerrainArchetype::MountainPeak => mountain(&mut chunk, geometry, h - geometry.ceiling, w / 3),
        TerrainArchetype::SparsePlatforms => sparse_platforms(&mut chunk, geometry, stairs),
        TerrainArchetype::TJunctionNorth => {
            horizontal_band(&mut chunk, geometry, 0, w);
            vertical_band(&mut chunk, geometry, 0, r1);
        }
        TerrainArchetype::TJunctionSouth => {
            horizontal_band(&mut chunk, geometry, 0, w);
            vertical_band(&mut chunk, geometry, r0, h);
        }
        TerrainArchetype::CrossJunction => {
            horizontal_band(&mut chunk, geometry, 0, w);
            vertical_band(&mut chunk, geometry, 0, h);
        }
        TerrainArchetype::LandingZone => {
            vertical_band(&mut chunk, geometry, 0, h);
            let ledge_width = ((c1 - c0) / 2).max(1);
            chunk.add_platform(c0, c0 + ledge_width, h / 2);
        }
    }

    carve_open_sides(&mut chunk, open_sides, geometry);
    chunk
}

/// Clears the shared band from the chunk center to every open side, so connected
/// neighbours meet on the same rows or columns.
pub(super) fn carve_open_sides(chunk: &mut Chunk, open_sides: DirectionSet, geometry: &CellGeometry) {
    let center = geometry.center();
    for side in open_sides.iter() {
        match side {
            Direction::East => horizontal_band(chunk, geometry, center.x, geometry.width),
            Direction::West => horizontal_band(chunk, geometry, 0, center.x + 1),
            Direction::North => vertical_band(chunk, geometry, 0, center.y + 1),
            Direction::South => vertical_band(chunk, geometry, center.y, geometry.height),
        }
    }
}

/// Open band rows over columns `[x1, x2)`, with the rows just outside the band walled.
fn horizontal_band(chunk: &mut Chunk, geometry: &CellGeometry, x1: i32, x2: i32) {
    let (r0, r1) = geometry.band_rows();
    chunk.fill_rect(x1, r0, x2, r1, TileIntent::Open);
    for x in x1..x2 {
        chunk.harden(x, r0 - 1);
        chunk.harden(x, r1);
    }
}

/// Open band columns over rows `[y1, y2)`, with the columns just outside the band walled.
fn vertical_band(chunk: &mut Chunk, geometry: &CellGeometry, y1: i32, y2: i32) {
    let (c0, c1) = geometry.band_cols();
    chunk.fill_rect(c0, y1, c1, y2, TileIntent::Open);
    for y in y1..y2 {
        chunk.harden(c0 - 1, y);
        chunk.harden(c1, y);
    }
}

pub(super) fn shaft_ledges(chunk: &mut Chunk, geometry: &CellGeometry, stairs: &StairConfig) {
    let (c0, c1) = geometry.band_cols();
    let width = stairs.platform_width.min(c1 - c0);
    let step = stairs.safe_step_height.max(1);

    let mut y = geometry.height - step;
    let mut k = 0;
    while y > 0 {
        // every second pair of ledges is pushed in from the wall
        let inset = if (k / 2) % 2 == 1 { stairs.horizontal_offset } else { 0 };
        let x = if k % 2 == 0 {
            (c0 + inset).min(c1 - width)
        } else {
            (c1 - width - inset).max(c0)
        };
        chunk.add_platform(x, x + width, y);
        y -= step;
        k += 1;
    }
}

fn corner(chunk: &mut Chunk, archetype: TerrainArchetype, geometry: &CellGeometry) {
    let w = geometry.width;
    let h = geometry.height;
    let wall = geometry.corner_wall;

    let (x1, x2, wall_col) = match archetype {
        TerrainArchetype::CornerNorthEast | TerrainArchetype::CornerSouthEast => (wall, w, wall - 1),
        _ => (0, w - wall, w - wall),
    };
    let (y1, y2, wall_row) = match archetype {
        TerrainArchetype::CornerNorthEast | TerrainArchetype::CornerNorthWest => {
            (0, h - geometry.floor, h - geometry.floor)
        }
        _ => (geometry.ceiling, h, geometry.ceiling - 1),
    };

    chunk.fill_rect(x1, y1, x2, y2, TileIntent::Open);
    for y in y1..y2 {
        chunk.harden(wall_col, y);
    }
    for x in x1..x2 {
        chunk.harden(x, wall_row);
    }
}

fn staircase(chunk: &mut Chunk, geometry: &CellGeometry, stairs: &StairConfig, rising_east: bool) {
    let w = geometry.width;
    let h = geometry.height;
    let width = stairs.platform_width.max(1);
    // keep a corridor's worth of headroom above the top step
    let max_surface = (h - geometry.ceiling - 3).max(geometry.floor);

    for x in 0..w {
        let dx = if rising_east { x } else { w - 1 - x };
        let surface = (geometry.floor + (dx / width) * stairs.safe_step_height).min(max_surface);
        for y in 0..h {
            let above_bottom = h - 1 - y;
            let intent = if above_bottom < surface {
                TileIntent::Wall
            } else {
                TileIntent::Open
            };
            chunk.set(x, y, intent);
        }
    }
}

fn mountain(chunk: &mut Chunk, geometry: &CellGeometry, peak: i32, half_width: i32) {
    let w = geometry.width;
    let h = geometry.height;
    let center = w / 2;
    let half_width = half_width.max(1) as f32;

    for x in 0..w {
        let falloff = 1.0 - ((x - center).abs() as f32 / half_width);
        let height = ((peak as f32) * falloff).round() as i32;
        let height = height.max(geometry.floor.min(peak));
        for y in 0..h {
            if h - 1 - y < height {
                chunk.set(x, y, TileIntent::Wall);
            }
        }
    }
}

fn sparse_platforms(chunk: &mut Chunk, geometry: &CellGeometry, stairs: &StairConfig) {
    let w = geometry.width;
    let h = geometry.height;
    chunk.intent.fill(TileIntent::Wall);
    chunk.fill_rect(1, 1, w - 1, h - 1, TileIntent::Open);

    let width = stairs.platform_width.max(1);
    for (i, fraction) in [3, 2, 1].into_iter().enumerate() {
        let y = h * fraction / 4;
        let center = if i % 2 == 0 { w / 4 } else { 3 * w / 4 };
        let x = center - width / 2;
        chunk.add_platform(x, x + width, y);
    }
}

/// Initial builder for the archetype strategy: one chunk per valid cell.
pub struct ArchetypeBuilder {
    stairs: StairConfig,
}

impl ArchetypeBuilder {
    pub fn new(config: &LevelConfig) -> Box<Self> {
        Box::new(Self {
            stairs: config.stairs.clone(),
        })
    }
}

impl InitialMapBuilder for ArchetypeBuilder {
    fn build_map(&mut self, _rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        let geometry = build_data.geometry;
        let cells: Vec<(IVec2, DirectionSet)> = build_data
            .graph
            .nodes()
            .map(|node| (node.pos, node.open_sides()))
            .collect();

        for (cell, open_sides) in cells {
            let archetype = build_data
                .archetypes
                .at(cell)
                .unwrap_or(TerrainArchetype::Solid);
            let chunk = rasterize_chunk(archetype, open_sides, &geometry, &self.stairs);
            chunk.stamp(build_data, cell)?;
        }

        debug!(
            "room {}: archetype chunks stamped, {} platform tiles",
            build_data.room_index,
            build_data.map.platforms.cells().iter().filter(|p| **p).count()
        );
        build_data.take_snapshot();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CellConfig;

    fn geometry() -> CellGeometry {
        CellGeometry::from_config(&CellConfig::default())
    }

    fn chunk(archetype: TerrainArchetype, sides: &[Direction]) -> Chunk {
        rasterize_chunk(
            archetype,
            sides.iter().copied().collect(),
            &geometry(),
            &StairConfig::default(),
        )
    }

    #[test]
    fn corridor_band_is_open_and_framed() {
        let geo = geometry();
        let c = chunk(TerrainArchetype::Corridor, &[Direction::East, Direction::West]);
        let (r0, r1) = geo.band_rows();
        for x in 0..geo.width {
            for y in r0..r1 {
                assert_eq!(c.intent.get(x, y), Some(TileIntent::Open));
            }
            assert_eq!(c.intent.get(x, r0 - 1), Some(TileIntent::Wall));
            assert_eq!(c.intent.get(x, r1), Some(TileIntent::Wall));
            assert_eq!(c.intent.get(x, 0), Some(TileIntent::Cave));
        }
    }

    #[test]
    fn shaft_has_alternating_ledges() {
        let geo = geometry();
        let c = chunk(TerrainArchetype::Shaft, &[Direction::North, Direction::South]);
        let (c0, c1) = geo.band_cols();
        assert_eq!(c.intent.get(c0, 0), Some(TileIntent::Open));
        assert_eq!(c.intent.get(c0 - 1, 0), Some(TileIntent::Wall));

        let mut rows: Vec<i32> = c.platforms.iter().map(|p| p.y).collect();
        rows.dedup();
        assert_eq!(rows, vec![15, 12, 9, 6, 3]);
        let first: Vec<_> = c.platforms.iter().filter(|p| p.y == 15).collect();
        let second: Vec<_> = c.platforms.iter().filter(|p| p.y == 12).collect();
        assert!(first.iter().all(|p| p.x < (c0 + c1) / 2));
        assert!(second.iter().all(|p| p.x >= (c0 + c1) / 2));
    }

    #[test]
    fn open_sides_line_up_with_neighbours() {
        let geo = geometry();
        let (r0, r1) = geo.band_rows();
        let (c0, c1) = geo.band_cols();
        for archetype in TerrainArchetype::ALL {
            if *archetype == TerrainArchetype::Solid {
                continue;
            }
            let c = chunk(*archetype, &[Direction::East, Direction::South]);
            for y in r0..r1 {
                assert_eq!(
                    c.intent.get(geo.width - 1, y),
                    Some(TileIntent::Open),
                    "{} east edge row {y}",
                    archetype.name()
                );
            }
            for x in c0..c1 {
                assert_eq!(
                    c.intent.get(x, geo.height - 1),
                    Some(TileIntent::Open),
                    "{} south edge col {x}",
                    archetype.name()
                );
            }
        }
    }

    #[test]
    fn stairs_rise_toward_the_named_side() {
        let geo = geometry();
        let c = chunk(TerrainArchetype::StairsAscendingEast, &[]);
        let surface = |x: i32| (0..geo.height).filter(|y| c.intent.get(x, *y) == Some(TileIntent::Wall)).count();
        assert_eq!(surface(0), geo.floor as usize);
        assert!(surface(geo.width - 1) > surface(0));
        for x in 1..geo.width {
            assert!(surface(x) >= surface(x - 1));
        }
        // headroom is never closed off
        assert_eq!(c.intent.get(geo.width - 1, geo.ceiling + 2), Some(TileIntent::Open));
    }

    #[test]
    fn peak_is_taller_than_base() {
        let geo = geometry();
        let walls = |c: &Chunk| (0..geo.height).filter(|y| c.intent.get(geo.width / 2, *y) == Some(TileIntent::Wall)).count();
        let base = chunk(TerrainArchetype::MountainBase, &[]);
        let peak = chunk(TerrainArchetype::MountainPeak, &[]);
        assert!(walls(&peak) > walls(&base));
        assert_eq!(base.intent.get(geo.width / 2, 0), Some(TileIntent::Cave));
    }

    #[test]
    fn solid_and_open_cells() {
        let solid = chunk(TerrainArchetype::Solid, &[]);
        assert!(solid.intent.cells().iter().all(|i| *i == TileIntent::Wall));
        let open = chunk(TerrainArchetype::Open, &[]);
        let geo = geometry();
        assert_eq!(open.intent.get(3, 3), Some(TileIntent::Open));
        assert_eq!(open.intent.get(3, geo.height - 1), Some(TileIntent::Cave));
    }

    #[test]
    fn platforms_only_on_open_tiles() {
        for archetype in TerrainArchetype::ALL {
            let c = chunk(*archetype, &[Direction::West]);
            for p in &c.platforms {
                assert_eq!(c.intent.at(*p), Some(TileIntent::Open));
            }
        }
        let sparse = chunk(TerrainArchetype::SparsePlatforms, &[]);
        assert_eq!(sparse.platforms.len(), 9);
    }
}
