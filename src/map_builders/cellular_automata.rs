use bevy::log::debug;

use crate::config::CaveConfig;
use crate::error::GenError;
use crate::rng::LevelRng;

use super::{BuilderMap, MetaMapBuilder, TileIntent};

/// Random fill of cave material. Denser near the region edge and near each cell's floor.
pub struct CaveFill {
    density: f32,
    edge_multiplier: f32,
    edge_falloff: i32,
    floor_multiplier: f32,
    floor_falloff: i32,
}

impl CaveFill {
    pub fn new(cave: &CaveConfig) -> Box<Self> {
        Box::new(Self {
            density: cave.fill_density,
            edge_multiplier: cave.edge_fill_multiplier,
            edge_falloff: cave.edge_falloff_tiles,
            floor_multiplier: cave.floor_fill_multiplier,
            floor_falloff: cave.floor_falloff_tiles,
        })
    }

    /// Linear ramp from `multiplier` at distance 0 to 1 at `falloff`.
    fn ramp(multiplier: f32, falloff: i32, distance: i32) -> f32 {
        if falloff <= 0 || distance >= falloff {
            return 1.0;
        }
        let t = distance.max(0) as f32 / falloff as f32;
        multiplier + (1.0 - multiplier) * t
    }

    pub fn fill_chance(&self, edge_distance: i32, floor_distance: i32) -> f32 {
        let chance = self.density
            * Self::ramp(self.edge_multiplier, self.edge_falloff, edge_distance)
            * Self::ramp(self.floor_multiplier, self.floor_falloff, floor_distance);
        chance.clamp(0.0, 1.0)
    }
}

impl MetaMapBuilder for CaveFill {
    fn build_map(&mut self, rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        let cell_height = build_data.geometry.height;
        let mut filled = 0;

        for y in 0..build_data.map.height {
            for x in 0..build_data.map.width {
                if build_data.intent.get(x, y) != Some(TileIntent::Cave) {
                    continue;
                }
                let edge = build_data.edge_distance.get(x, y).unwrap_or(0);
                let floor = cell_height - 1 - y.rem_euclid(cell_height);
                let solid = rng.roll_chance(self.fill_chance(edge, floor));
                build_data.map.solid.set(x, y, solid)?;
                if solid {
                    filled += 1;
                }
            }
        }

        debug!("room {}: cave fill set {filled} tiles", build_data.room_index);
        build_data.take_snapshot();
        Ok(())
    }
}

/// Majority-rule smoothing of cave material, 8 neighbours, outside counted as solid.
pub struct CaveSmoothing {
    iterations: u32,
}

impl CaveSmoothing {
    pub fn new(iterations: u32) -> Box<Self> {
        Box::new(Self { iterations })
    }
}

fn count_solid_neighbors(build_data: &BuilderMap, x: i32, y: i32) -> usize {
    let mut count = 0;
    for dy in -1..=1i32 {
        for dx in -1..=1i32 {
            if dx == 0 && dy == 0 {
                continue;
            }
            if build_data.map.is_solid(x + dx, y + dy) {
                count += 1;
            }
        }
    }
    count
}

impl MetaMapBuilder for CaveSmoothing {
    fn build_map(&mut self, _rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        for _ in 0..self.iterations {
            let mut next = build_data.map.solid.clone();

            for y in 0..build_data.map.height {
                for x in 0..build_data.map.width {
                    if build_data.intent.get(x, y) != Some(TileIntent::Cave) {
                        continue;
                    }
                    let neighbors = count_solid_neighbors(build_data, x, y);
                    next.set(x, y, neighbors >= 5)?;
                }
            }

            build_data.map.solid = next;
            build_data.take_snapshot();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelConfig;
    use crate::map_builders::{BuilderMap, CellGeometry, TerrainArchetypeMapper};
    use crate::room_graph::RoomGraphBuilder;

    fn cave_room(config: &LevelConfig) -> BuilderMap {
        let mut rng = LevelRng::seeded(3);
        let graph = RoomGraphBuilder::new(config).build(&mut rng).unwrap();
        let archetypes = TerrainArchetypeMapper::new(config).map(&graph, &mut rng);
        let mut data = BuilderMap::new(0, graph, archetypes, CellGeometry::from_config(&config.cell));
        data.intent.fill(super::TileIntent::Cave);
        data
    }

    #[test]
    fn chance_ramps_toward_edges_and_floors() {
        let fill = CaveFill::new(&CaveConfig::default());
        assert!((fill.fill_chance(10, 10) - 0.5).abs() < 1e-6);
        assert!((fill.fill_chance(0, 10) - 0.7).abs() < 1e-6);
        assert!((fill.fill_chance(0, 0) - 0.84).abs() < 1e-6);
        assert!(fill.fill_chance(2, 10) > 0.5 && fill.fill_chance(2, 10) < 0.7);

        let mut dense = CaveConfig::default();
        dense.fill_density = 1.0;
        assert_eq!(CaveFill::new(&dense).fill_chance(0, 0), 1.0);
    }

    #[test]
    fn fill_extremes() {
        let config = LevelConfig::default();
        let mut rng = LevelRng::seeded(4);

        let mut data = cave_room(&config);
        let mut cave = config.cave.clone();
        cave.fill_density = 0.0;
        CaveFill::new(&cave).build_map(&mut rng, &mut data).unwrap();
        assert_eq!(data.map.solid_count(), 0);

        cave.fill_density = 1.0;
        CaveFill::new(&cave).build_map(&mut rng, &mut data).unwrap();
        assert_eq!(data.map.solid_count(), data.map.solid.len());
    }

    #[test]
    fn only_cave_tiles_are_touched() {
        let config = LevelConfig::default();
        let mut rng = LevelRng::seeded(4);
        let mut data = cave_room(&config);
        data.force(10, 10, TileIntent::Open);
        data.force(11, 10, TileIntent::Wall);

        let mut cave = config.cave.clone();
        cave.fill_density = 1.0;
        CaveFill::new(&cave).build_map(&mut rng, &mut data).unwrap();
        CaveSmoothing::new(3).build_map(&mut rng, &mut data).unwrap();
        assert!(!data.map.is_solid(10, 10));
        assert!(data.map.is_solid(11, 10));
    }

    #[test]
    fn smoothing_removes_specks_and_fills_pits() {
        let config = LevelConfig::default();
        let mut rng = LevelRng::seeded(4);
        let mut data = cave_room(&config);
        data.map.solid.fill(false);
        data.map.solid.set(20, 20, true).unwrap();
        CaveSmoothing::new(1).build_map(&mut rng, &mut data).unwrap();
        assert!(!data.map.is_solid(20, 20));
        // corners see five outside neighbours
        assert!(data.map.is_solid(0, 0));

        data.map.solid.fill(true);
        data.map.solid.set(30, 30, false).unwrap();
        CaveSmoothing::new(1).build_map(&mut rng, &mut data).unwrap();
        assert!(data.map.is_solid(30, 30));
    }
}
