use bevy::log::{info, warn};
use bevy::math::{Rect, Vec2};
use bevy::prelude::Resource;
use serde::Serialize;

use crate::config::LevelConfig;
use crate::error::{GenError, GenWarning};
use crate::grid::Grid;
use crate::layout::LevelLayout;
use crate::map::TerrainMap;
use crate::map_builders::{
    room_builder, CellGeometry, PortalAnchor, PortalKind, TerrainArchetype, TerrainArchetypeMapper,
};
use crate::pathfinding::CorridorPathfinder;
use crate::rng::LevelRng;
use crate::room_graph::{RoomGraph, RoomGraphBuilder};
use crate::spawn::SpawnExitLocator;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedRoom {
    pub index: usize,
    /// World position of the room's top-left tile corner.
    pub origin: Vec2,
    pub graph: RoomGraph,
    pub archetypes: Grid<TerrainArchetype>,
    pub map: TerrainMap,
    /// Room-local anchors.
    pub portals: Vec<PortalAnchor>,
    /// Terrain after each builder step, when requested.
    #[serde(skip)]
    pub history: Vec<TerrainMap>,
}

impl GeneratedRoom {
    pub fn bounds(&self) -> Rect {
        Rect::from_corners(
            self.origin,
            self.origin + Vec2::new(self.map.width as f32, self.map.height as f32),
        )
    }

    pub fn portal(&self, kind: PortalKind) -> Option<&PortalAnchor> {
        self.portals.iter().find(|p| p.kind == kind)
    }
}

/// Axis-aligned polyline in world space from one room's exit to the next room's entrance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorridorPath {
    pub from_room: usize,
    pub to_room: usize,
    pub points: Vec<Vec2>,
}

impl CorridorPath {
    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// Everything one run produced.
#[derive(Resource, Debug, Clone, Serialize)]
pub struct GeneratedLevel {
    pub seed: u64,
    pub tile_set: String,
    pub layout: LevelLayout,
    pub rooms: Vec<GeneratedRoom>,
    /// World-space anchors of every room, in room order.
    pub portals: Vec<PortalAnchor>,
    pub corridors: Vec<CorridorPath>,
    pub spawn_point: Vec2,
    pub exit_point: Vec2,
    pub warnings: Vec<GenWarning>,
}

impl GeneratedLevel {
    pub fn to_json(&self) -> Result<String, GenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the whole pipeline for one configuration.
pub struct LevelGenerator {
    config: LevelConfig,
    keep_history: bool,
}

impl LevelGenerator {
    pub fn new(config: LevelConfig) -> Self {
        Self {
            config,
            keep_history: false,
        }
    }

    pub fn with_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn generate(&self) -> Result<GeneratedLevel, GenError> {
        let config = &self.config;
        config.validate()?;

        let (mut rng, seed) = LevelRng::from_config_seed(config.seed);
        if config.seed == 0 {
            info!("no seed configured, using {seed}");
        }

        let layout = LevelLayout::plan(config)?;
        let mut warnings = Vec::new();

        let mut rooms = Vec::with_capacity(layout.origins.len());
        for (index, origin) in layout.origins.iter().enumerate() {
            rooms.push(self.build_room(index, *origin, &mut rng, &mut warnings)?);
        }

        let portals: Vec<PortalAnchor> = rooms
            .iter()
            .flat_map(|room| room.portals.iter().map(|p| p.translated(room.origin)))
            .collect();

        let corridors = self.route_corridors(&layout, &rooms, &mut warnings);
        let (spawn_point, exit_point) = self.locate_endpoints(&rooms, &mut warnings)?;

        info!(
            "generated {} rooms and {} corridors from seed {seed} with {} warnings",
            rooms.len(),
            corridors.len(),
            warnings.len()
        );

        Ok(GeneratedLevel {
            seed,
            tile_set: config.tile_set.clone(),
            layout,
            rooms,
            portals,
            corridors,
            spawn_point,
            exit_point,
            warnings,
        })
    }

    fn build_room(
        &self,
        index: usize,
        origin: Vec2,
        rng: &mut LevelRng,
        warnings: &mut Vec<GenWarning>,
    ) -> Result<GeneratedRoom, GenError> {
        let config = &self.config;
        let graph = RoomGraphBuilder::new(config).build(rng)?;
        let archetypes = TerrainArchetypeMapper::new(config).map(&graph, rng);

        let mut chain = room_builder(config, index, graph, archetypes);
        chain.build_data.keep_history = self.keep_history;
        chain.build_map(rng)?;
        let data = chain.into_build_data();

        info!(
            "room {index}: {} path cells, {} solid tiles",
            data.graph.critical_path().len(),
            data.map.solid_count()
        );
        warnings.extend(data.warnings);

        Ok(GeneratedRoom {
            index,
            origin,
            graph: data.graph,
            archetypes: data.archetypes,
            map: data.map,
            portals: data.portals,
            history: data.history,
        })
    }

    fn route_corridors(
        &self,
        layout: &LevelLayout,
        rooms: &[GeneratedRoom],
        warnings: &mut Vec<GenWarning>,
    ) -> Vec<CorridorPath> {
        if rooms.len() < 2 {
            return Vec::new();
        }
        let finder = CorridorPathfinder::new(&self.config.pathfinding, layout.bounds, layout.room_rects());

        let mut corridors = Vec::new();
        for pair in rooms.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let route = match (from.portal(PortalKind::Exit), to.portal(PortalKind::Entrance)) {
                (Some(exit), Some(entrance)) => {
                    finder.route(&exit.translated(from.origin), &entrance.translated(to.origin))
                }
                _ => None,
            };
            match route {
                Some(points) => corridors.push(CorridorPath {
                    from_room: from.index,
                    to_room: to.index,
                    points,
                }),
                None => {
                    let warning = GenWarning::PathfindingFailure {
                        from_room: from.index,
                        to_room: to.index,
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }
        corridors
    }

    /// Spawn in the first room's entry cell, exit in the last room's exit cell.
    fn locate_endpoints(
        &self,
        rooms: &[GeneratedRoom],
        warnings: &mut Vec<GenWarning>,
    ) -> Result<(Vec2, Vec2), GenError> {
        let (Some(first), Some(last)) = (rooms.first(), rooms.last()) else {
            return Err(GenError::invalid("layout produced no rooms"));
        };
        let spawn = self.locate(first, PortalKind::Entrance, warnings);
        let exit = self.locate(last, PortalKind::Exit, warnings);
        Ok((spawn, exit))
    }

    fn locate(&self, room: &GeneratedRoom, kind: PortalKind, warnings: &mut Vec<GenWarning>) -> Vec2 {
        let geometry = CellGeometry::from_config(&self.config.cell);
        let cell = match kind {
            PortalKind::Entrance => room.graph.entry(),
            PortalKind::Exit => room.graph.exit(),
        };
        let region = geometry.cell_rect(cell);
        let anchor = room
            .portal(kind)
            .map(|p| p.point)
            .unwrap_or_else(|| region.center_f32());

        let locator = SpawnExitLocator::new(&self.config.spawn);
        match locator.farthest_standable(&room.map, &region, anchor) {
            Some((tile, _)) => room.origin + room.map.tile_center(tile),
            None => {
                let fallback = room.origin + region.center_f32();
                let warning = GenWarning::NoStandablePoint {
                    room: room.index,
                    anchor: room.origin + anchor,
                    fallback,
                };
                warn!("{warning}");
                warnings.push(warning);
                fallback
            }
        }
    }
}

/// Convenience wrapper around [`LevelGenerator`].
pub fn generate(config: &LevelConfig) -> Result<GeneratedLevel, GenError> {
    LevelGenerator::new(config.clone()).generate()
}
