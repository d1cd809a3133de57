use bevy::log::debug;
use bevy::math::IVec2;

use crate::config::{LevelConfig, StairConfig};
use crate::direction::{Direction, DirectionSet};
use crate::error::GenError;
use crate::rng::LevelRng;

use super::chunk_fill::{carve_open_sides, shaft_ledges, Chunk};
use super::{BuilderMap, InitialMapBuilder, TileIntent};

/// Alternate strategy: every valid cell is left to the cave pass, with only the
/// connection bands held open. Vertical bands get the shaft ledges so they can be
/// climbed and stood in.
pub struct DensityOnlyBuilder {
    stairs: StairConfig,
}

impl DensityOnlyBuilder {
    pub fn new(config: &LevelConfig) -> Box<Self> {
        Box::new(Self {
            stairs: config.stairs.clone(),
        })
    }
}

impl InitialMapBuilder for DensityOnlyBuilder {
    fn build_map(&mut self, _rng: &mut LevelRng, build_data: &mut BuilderMap) -> Result<(), GenError> {
        let geometry = build_data.geometry;
        let cells: Vec<(IVec2, DirectionSet)> = build_data
            .graph
            .nodes()
            .map(|node| (node.pos, node.open_sides()))
            .collect();

        for (cell, open_sides) in cells {
            let mut chunk = Chunk::filled(&geometry, TileIntent::Cave);
            carve_open_sides(&mut chunk, open_sides, &geometry);
            if open_sides.contains(Direction::North) || open_sides.contains(Direction::South) {
                shaft_ledges(&mut chunk, &geometry, &self.stairs);
            }
            chunk.stamp(build_data, cell)?;
        }

        debug!("room {}: density-only fill prepared", build_data.room_index);
        build_data.take_snapshot();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationStrategy;
    use crate::map_builders::{room_builder, TerrainArchetypeMapper};
    use crate::room_graph::RoomGraphBuilder;

    #[test]
    fn only_connection_bands_are_open() {
        let mut config = LevelConfig::default();
        config.strategy = GenerationStrategy::DensityOnly;
        let mut rng = LevelRng::seeded(9);
        let graph = RoomGraphBuilder::new(&config).build(&mut rng).unwrap();
        let archetypes = TerrainArchetypeMapper::new(&config).map(&graph, &mut rng);
        let mut chain = room_builder(&config, 0, graph, archetypes);

        DensityOnlyBuilder::new(&config)
            .build_map(&mut rng, &mut chain.build_data)
            .unwrap();
        let data = &chain.build_data;

        let geo = data.geometry;
        for node in data.graph.nodes() {
            let origin = geo.origin(node.pos);
            let center = origin + geo.center();
            let expected = if node.open_sides().is_empty() {
                TileIntent::Cave
            } else {
                TileIntent::Open
            };
            assert_eq!(data.intent.at(center), Some(expected));
            // cell corners are never part of a band
            assert_eq!(data.intent.at(origin), Some(TileIntent::Cave));
        }
        for (pos, platform) in data.map.platforms.iter() {
            if *platform {
                assert_eq!(data.intent.at(pos), Some(TileIntent::Open), "{pos}");
            }
        }
    }

    #[test]
    fn vertical_bands_get_ledges() {
        let mut config = LevelConfig::default();
        config.strategy = GenerationStrategy::DensityOnly;
        let mut rng = LevelRng::seeded(9);
        let graph = RoomGraphBuilder::new(&config).build(&mut rng).unwrap();
        let archetypes = TerrainArchetypeMapper::new(&config).map(&graph, &mut rng);
        let mut chain = room_builder(&config, 0, graph, archetypes);

        DensityOnlyBuilder::new(&config)
            .build_map(&mut rng, &mut chain.build_data)
            .unwrap();
        let data = &chain.build_data;
        let geo = data.geometry;

        for node in data.graph.nodes() {
            let sides = node.open_sides();
            let vertical = sides.contains(Direction::North) || sides.contains(Direction::South);
            let origin = geo.origin(node.pos);
            let has_ledge = (0..geo.height)
                .flat_map(|y| (0..geo.width).map(move |x| origin + IVec2::new(x, y)))
                .any(|p| data.map.is_platform(p.x, p.y));
            assert_eq!(has_ledge, vertical, "cell {}", node.pos);
        }
    }
}
