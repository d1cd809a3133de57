use bevy::math::IVec2;
use serde::{Deserialize, Serialize};

use crate::config::LevelConfig;
use crate::direction::{Direction, DirectionSet};
use crate::grid::Grid;
use crate::rng::{LevelRng, RandomTable};
use crate::room_graph::RoomGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainArchetype {
    Solid,
    Open,
    Corridor,
    Shaft,
    CornerNorthEast,
    CornerNorthWest,
    CornerSouthEast,
    CornerSouthWest,
    StairsAscendingEast,
    StairsAscendingWest,
    MountainBase,
    MountainPeak,
    SparsePlatforms,
    TJunctionNorth,
    TJunctionSouth,
    CrossJunction,
    LandingZone,
}

impl TerrainArchetype {
    pub const ALL: &'static [TerrainArchetype] = &[
        TerrainArchetype::Solid,
        TerrainArchetype::Open,
        TerrainArchetype::Corridor,
        TerrainArchetype::Shaft,
        TerrainArchetype::CornerNorthEast,
        TerrainArchetype::CornerNorthWest,
        TerrainArchetype::CornerSouthEast,
        TerrainArchetype::CornerSouthWest,
        TerrainArchetype::StairsAscendingEast,
        TerrainArchetype::StairsAscendingWest,
        TerrainArchetype::MountainBase,
        TerrainArchetype::MountainPeak,
        TerrainArchetype::SparsePlatforms,
        TerrainArchetype::TJunctionNorth,
        TerrainArchetype::TJunctionSouth,
        TerrainArchetype::CrossJunction,
        TerrainArchetype::LandingZone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TerrainArchetype::Solid => "Solid",
            TerrainArchetype::Open => "Open",
            TerrainArchetype::Corridor => "Corridor",
            TerrainArchetype::Shaft => "Shaft",
            TerrainArchetype::CornerNorthEast => "Corner (N+E)",
            TerrainArchetype::CornerNorthWest => "Corner (N+W)",
            TerrainArchetype::CornerSouthEast => "Corner (S+E)",
            TerrainArchetype::CornerSouthWest => "Corner (S+W)",
            TerrainArchetype::StairsAscendingEast => "Stairs (rising east)",
            TerrainArchetype::StairsAscendingWest => "Stairs (rising west)",
            TerrainArchetype::MountainBase => "Mountain Base",
            TerrainArchetype::MountainPeak => "Mountain Peak",
            TerrainArchetype::SparsePlatforms => "Sparse Platforms",
            TerrainArchetype::TJunctionNorth => "T-Junction (N)",
            TerrainArchetype::TJunctionSouth => "T-Junction (S)",
            TerrainArchetype::CrossJunction => "Cross Junction",
            TerrainArchetype::LandingZone => "Landing Zone",
        }
    }
}

/// Assigns one archetype per grid cell from the room graph's topology.
pub struct TerrainArchetypeMapper {
    sparse_platform_chance: f32,
}

impl TerrainArchetypeMapper {
    pub fn new(config: &LevelConfig) -> Self {
        Self {
            sparse_platform_chance: config.grid.sparse_platform_chance,
        }
    }

    pub fn map(&self, graph: &RoomGraph, rng: &mut LevelRng) -> Grid<TerrainArchetype> {
        let mut archetypes = Grid::new(graph.width(), graph.height(), TerrainArchetype::Solid);
        let (path_top, path_bottom) = graph.path_rows();

        // Weights in percent; the table keeps the roll a single draw.
        let sparse = (self.sparse_platform_chance * 100.0).round() as i32;
        let beside_path = RandomTable::new()
            .add(TerrainArchetype::SparsePlatforms, sparse)
            .add(TerrainArchetype::MountainBase, 100 - sparse);

        for y in 0..graph.height() {
            for x in 0..graph.width() {
                let pos = IVec2::new(x, y);
                let Some(node) = graph.node(pos) else {
                    continue;
                };

                let archetype = if node.on_critical_path {
                    classify_path_cell(node.connections)
                } else if node.branch {
                    TerrainArchetype::SparsePlatforms
                } else if y < path_top {
                    TerrainArchetype::Open
                } else if y > path_bottom {
                    TerrainArchetype::MountainBase
                } else if adjacent_to_path(graph, pos) {
                    beside_path
                        .roll(rng)
                        .unwrap_or(TerrainArchetype::MountainBase)
                } else {
                    TerrainArchetype::MountainPeak
                };
                archetypes.set_clipped(x, y, archetype);
            }
        }

        archetypes
    }
}

fn adjacent_to_path(graph: &RoomGraph, pos: IVec2) -> bool {
    Direction::ALL
        .into_iter()
        .any(|d| graph.is_on_path(pos + d.offset()))
}

/// Classification of a critical-path cell by its connections. Doors are not counted.
pub fn classify_path_cell(connections: DirectionSet) -> TerrainArchetype {
    let horizontal = connections.horizontal_count();
    let vertical = connections.vertical_count();

    match connections.len() {
        4 => TerrainArchetype::CrossJunction,
        3 if horizontal == 2 => {
            if connections.contains(Direction::North) {
                TerrainArchetype::TJunctionNorth
            } else {
                TerrainArchetype::TJunctionSouth
            }
        }
        3 => TerrainArchetype::Corridor,
        2 if horizontal == 2 => TerrainArchetype::Corridor,
        2 if vertical == 2 => TerrainArchetype::Shaft,
        2 => {
            let east = connections.contains(Direction::East);
            if connections.contains(Direction::South) {
                TerrainArchetype::LandingZone
            } else if east {
                TerrainArchetype::CornerNorthEast
            } else {
                TerrainArchetype::CornerNorthWest
            }
        }
        1 if vertical == 1 => TerrainArchetype::Shaft,
        _ => TerrainArchetype::Corridor,
    }
}
