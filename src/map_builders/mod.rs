mod accessibility;
mod archetypes;
mod boundary;
mod cellular_automata;
mod chunk_fill;
mod density;
mod doors;

use std::collections::VecDeque;

use bevy::log::debug;
use bevy::math::IVec2;
use serde::{Deserialize, Serialize};

use crate::config::{CellConfig, GenerationStrategy, LevelConfig};
use crate::error::{GenError, GenWarning};
use crate::grid::Grid;
use crate::map::TerrainMap;
use crate::rng::LevelRng;
use crate::room_graph::RoomGraph;
use crate::shapes::Rect;

pub use accessibility::{
    find_clusters, PlatformAccessibilityVerifier, PlatformCluster, VerifierReport,
};
pub use archetypes::{TerrainArchetype, TerrainArchetypeMapper};
pub use boundary::{BoundaryCarving, ConnectionClearing};
pub use cellular_automata::{CaveFill, CaveSmoothing};
pub use chunk_fill::{rasterize_chunk, ArchetypeBuilder, Chunk};
pub use density::DensityOnlyBuilder;
pub use doors::{PortalAnchor, PortalCarving, PortalKind};

/// What the rasterizer wants a tile to be before cave fill runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileIntent {
    /// Kept clear no matter what the cave pass rolls.
    Open,
    /// Structural solid.
    Wall,
    /// Decided by cave fill and smoothing.
    Cave,
}

/// Tile layout of one room-grid cell and the bands every archetype shares, so that
/// connected neighbours always line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGeometry {
    pub width: i32,
    pub height: i32,
    pub ceiling: i32,
    pub floor: i32,
    pub shaft_wall: i32,
    pub corner_wall: i32,
}

impl CellGeometry {
    pub fn from_config(cell: &CellConfig) -> Self {
        Self {
            width: cell.width,
            height: cell.height,
            ceiling: cell.ceiling_height,
            floor: cell.floor_height,
            shaft_wall: cell.shaft_wall_width,
            corner_wall: cell.corner_wall_width,
        }
    }

    /// Rows `[start, end)` of the horizontal travel band.
    pub fn band_rows(&self) -> (i32, i32) {
        (self.ceiling, self.height - self.floor)
    }

    /// Columns `[start, end)` of the vertical travel band.
    pub fn band_cols(&self) -> (i32, i32) {
        (self.shaft_wall, self.width - self.shaft_wall)
    }

    pub fn center(&self) -> IVec2 {
        IVec2::new(self.width / 2, self.height / 2)
    }

    pub fn origin(&self, cell: IVec2) -> IVec2 {
        IVec2::new(cell.x * self.width, cell.y * self.height)
    }

    pub fn cell_rect(&self, cell: IVec2) -> Rect {
        let origin = self.origin(cell);
        Rect::new(origin.x, origin.y, self.width, self.height)
    }

    pub fn cell_of(&self, tile: IVec2) -> IVec2 {
        IVec2::new(
            tile.x.div_euclid(self.width),
            tile.y.div_euclid(self.height),
        )
    }
}

/// Shared state the builders of one room work on.
pub struct BuilderMap {
    pub room_index: usize,
    pub map: TerrainMap,
    pub intent: Grid<TileIntent>,
    pub graph: RoomGraph,
    pub archetypes: Grid<TerrainArchetype>,
    pub geometry: CellGeometry,
    /// Chebyshev distance from each tile to the nearest tile outside the valid region.
    pub edge_distance: Grid<i32>,
    /// Room-local anchors, in tile units.
    pub portals: Vec<PortalAnchor>,
    pub warnings: Vec<GenWarning>,
    pub history: Vec<TerrainMap>,
    pub keep_history: bool,
}

impl BuilderMap {
    pub fn new(
        room_index: usize,
        graph: RoomGraph,
        archetypes: Grid<TerrainArchetype>,
        geometry: CellGeometry,
    ) -> Self {
        let width = graph.width() * geometry.width;
        let height = graph.height() * geometry.height;
        let mut build = Self {
            room_index,
            map: TerrainMap::new(width, height),
            intent: Grid::new(width, height, TileIntent::Wall),
            graph,
            archetypes,
            geometry,
            edge_distance: Grid::new(width, height, 0),
            portals: Vec::new(),
            warnings: Vec::new(),
            history: Vec::new(),
            keep_history: false,
        };
        build.edge_distance = build.compute_edge_distance();
        build
    }

    pub fn take_snapshot(&mut self) {
        if self.keep_history {
            self.history.push(self.map.clone());
        }
    }

    /// True when the tile belongs to a valid room-grid cell.
    pub fn is_valid_tile(&self, x: i32, y: i32) -> bool {
        self.map.in_bounds(x, y)
            && self
                .graph
                .is_valid(self.geometry.cell_of(IVec2::new(x, y)))
    }

    /// Writes terrain and intent together, so later passes see the decision.
    pub fn force(&mut self, x: i32, y: i32, intent: TileIntent) {
        if !self.map.in_bounds(x, y) {
            return;
        }
        self.intent.set_clipped(x, y, intent);
        match intent {
            TileIntent::Open => self.map.solid.set_clipped(x, y, false),
            TileIntent::Wall => {
                self.map.solid.set_clipped(x, y, true);
                self.map.platforms.set_clipped(x, y, false);
            }
            TileIntent::Cave => {}
        }
    }

    fn compute_edge_distance(&self) -> Grid<i32> {
        let width = self.map.width;
        let height = self.map.height;
        let mut dist = Grid::new(width, height, i32::MAX);
        let mut queue = VecDeque::new();

        // Seeds: valid tiles touching the outside (grid edge or an invalid cell).
        for y in 0..height {
            for x in 0..width {
                if !self.is_valid_tile(x, y) {
                    dist.set_clipped(x, y, -1);
                    continue;
                }
                let touches_outside = (-1..=1).any(|dy| {
                    (-1..=1).any(|dx| (dx != 0 || dy != 0) && !self.is_valid_tile(x + dx, y + dy))
                });
                if touches_outside {
                    dist.set_clipped(x, y, 0);
                    queue.push_back(IVec2::new(x, y));
                }
            }
        }

        while let Some(pos) = queue.pop_front() {
            let d = dist.at(pos).unwrap_or(0);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let next = pos + IVec2::new(dx, dy);
                    if dist.at(next) == Some(i32::MAX) {
                        dist.set_clipped(next.x, next.y, d + 1);
                        queue.push_back(next);
                    }
                }
            }
        }

        dist
    }
}

pub trait InitialMapBuilder {
    fn build_map(&mut self, rng: &mut LevelRng, build_data: &mut BuilderMap)
        -> Result<(), GenError>;
}

pub trait MetaMapBuilder {
    fn build_map(&mut self, rng: &mut LevelRng, build_data: &mut BuilderMap)
        -> Result<(), GenError>;
}

/// One initial builder followed by any number of meta builders, run in order.
pub struct BuilderChain {
    starter: Option<Box<dyn InitialMapBuilder>>,
    builders: Vec<Box<dyn MetaMapBuilder>>,
    pub build_data: BuilderMap,
}

impl BuilderChain {
    pub fn new(build_data: BuilderMap) -> BuilderChain {
        BuilderChain {
            starter: None,
            builders: Vec::new(),
            build_data,
        }
    }

    pub fn start_with(&mut self, starter: Box<dyn InitialMapBuilder>) -> &mut Self {
        self.starter = Some(starter);
        self
    }

    pub fn with(&mut self, metabuilder: Box<dyn MetaMapBuilder>) -> &mut Self {
        self.builders.push(metabuilder);
        self
    }

    pub fn build_map(&mut self, rng: &mut LevelRng) -> Result<(), GenError> {
        let Some(starter) = self.starter.as_mut() else {
            return Err(GenError::invalid("builder chain has no starting builder"));
        };
        starter.build_map(rng, &mut self.build_data)?;

        for metabuilder in self.builders.iter_mut() {
            metabuilder.build_map(rng, &mut self.build_data)?;
        }
        Ok(())
    }

    pub fn into_build_data(self) -> BuilderMap {
        self.build_data
    }
}

/// The rasterization pipeline for one room, for the configured strategy.
pub fn room_builder(
    config: &LevelConfig,
    room_index: usize,
    graph: RoomGraph,
    archetypes: Grid<TerrainArchetype>,
) -> BuilderChain {
    let geometry = CellGeometry::from_config(&config.cell);
    let mut chain = BuilderChain::new(BuilderMap::new(room_index, graph, archetypes, geometry));

    match config.strategy {
        GenerationStrategy::Archetype => {
            chain.start_with(ArchetypeBuilder::new(config));
        }
        GenerationStrategy::DensityOnly => {
            chain.start_with(DensityOnlyBuilder::new(config));
        }
    }
    debug!("room {room_index}: rasterizing with {:?}", config.strategy);

    chain
        .with(CaveFill::new(&config.cave))
        .with(CaveSmoothing::new(config.cave.smoothing_iterations + 3))
        .with(BoundaryCarving::new(config))
        .with(ConnectionClearing::new(&config.cave))
        .with(PortalCarving::new(config))
        .with(PlatformAccessibilityVerifier::new(config));
    chain
}
