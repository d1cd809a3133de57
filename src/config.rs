use std::fs;
use std::path::Path;

use bevy::math::IVec2;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::GenError;

/// How the initial terrain of each room is rasterized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStrategy {
    /// Per-cell archetype chunks, then cave fill inside the remaining mass.
    #[default]
    Archetype,
    /// Every valid cell is cave material; only connection bands are kept clear.
    DensityOnly,
}

/// Everything a generation run consumes. Loaded once, read-only during a run.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// 0 picks a random seed; the chosen seed is reported in the output.
    pub seed: u64,
    /// Tile set handed through to the painter. Required.
    pub tile_set: String,
    pub strategy: GenerationStrategy,
    pub grid: RoomGridConfig,
    pub cell: CellConfig,
    pub cave: CaveConfig,
    pub portal: PortalConfig,
    pub jump: JumpConfig,
    pub stairs: StairConfig,
    pub accessibility: AccessibilityConfig,
    pub spawn: SpawnConfig,
    pub pathfinding: PathfindingConfig,
    pub layout: LayoutConfig,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            tile_set: "cavern".to_string(),
            strategy: GenerationStrategy::Archetype,
            grid: RoomGridConfig::default(),
            cell: CellConfig::default(),
            cave: CaveConfig::default(),
            portal: PortalConfig::default(),
            jump: JumpConfig::default(),
            stairs: StairConfig::default(),
            accessibility: AccessibilityConfig::default(),
            spawn: SpawnConfig::default(),
            pathfinding: PathfindingConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomGridConfig {
    pub width: i32,
    pub height: i32,
    /// Cells that do not exist in the level.
    pub disabled_cells: Vec<(i32, i32)>,
    pub min_steps: i32,
    pub max_steps: i32,
    pub max_path_cells: usize,
    /// Off-path cells connected to the path. The first one is the shop.
    pub branch_count: usize,
    /// Chance that an off-path cell beside the path gets platforms instead of a mountain.
    pub sparse_platform_chance: f32,
}

impl Default for RoomGridConfig {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
            disabled_cells: Vec::new(),
            min_steps: 0,
            max_steps: 2,
            max_path_cells: 10,
            branch_count: 1,
            sparse_platform_chance: 0.6,
        }
    }
}

/// Tile dimensions of one grid cell and the band constants archetypes are drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub width: i32,
    pub height: i32,
    /// Reserved outer border band of the room, always solid apart from portals.
    pub wall_thickness: i32,
    pub ceiling_height: i32,
    pub floor_height: i32,
    pub shaft_wall_width: i32,
    pub corner_wall_width: i32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            width: 24,
            height: 18,
            wall_thickness: 2,
            ceiling_height: 4,
            floor_height: 4,
            shaft_wall_width: 8,
            corner_wall_width: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveConfig {
    pub fill_density: f32,
    /// The smoother runs this many rounds plus three.
    pub smoothing_iterations: u32,
    pub edge_fill_multiplier: f32,
    pub edge_falloff_tiles: i32,
    pub floor_fill_multiplier: f32,
    pub floor_falloff_tiles: i32,
    /// Extra frame depth inside the reserved band that boundary carving eats into.
    pub carve_max_depth: i32,
    pub carve_min_wavelength: f32,
    pub carve_max_wavelength: f32,
    pub safety_footprint_width: i32,
    pub safety_footprint_height: i32,
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            fill_density: 0.5,
            smoothing_iterations: 2,
            edge_fill_multiplier: 1.4,
            edge_falloff_tiles: 4,
            floor_fill_multiplier: 1.2,
            floor_falloff_tiles: 3,
            carve_max_depth: 3,
            carve_min_wavelength: 6.0,
            carve_max_wavelength: 14.0,
            safety_footprint_width: 4,
            safety_footprint_height: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub entrance_width: i32,
    /// How far the opening is cut into the room from its outer edge.
    pub entrance_height: i32,
    pub stub_length: f32,
    pub approach_distance: f32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            entrance_width: 4,
            entrance_height: 6,
            stub_length: 1.0,
            approach_distance: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    pub jump_force: f32,
    pub gravity: f32,
    pub reach_safety_factor: f32,
    pub max_platform_height_diff: i32,
    pub min_platform_gap: i32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            jump_force: 14.0,
            gravity: 20.0,
            reach_safety_factor: 0.85,
            max_platform_height_diff: 4,
            min_platform_gap: 2,
        }
    }
}

impl JumpConfig {
    /// Apex height of a jump, scaled down by the safety factor and capped by the
    /// designed platform height difference.
    pub fn safe_vertical_reach(&self) -> i32 {
        let apex = if self.gravity > 0.0 {
            self.jump_force * self.jump_force / (2.0 * self.gravity)
        } else {
            0.0
        };
        let reach = (apex * self.reach_safety_factor).floor() as i32;
        reach.min(self.max_platform_height_diff).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StairConfig {
    pub safe_step_height: i32,
    pub platform_width: i32,
    pub horizontal_offset: i32,
}

impl Default for StairConfig {
    fn default() -> Self {
        Self {
            safe_step_height: 3,
            platform_width: 3,
            horizontal_offset: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityConfig {
    pub max_rounds: usize,
    pub floor_height_threshold: i32,
    pub horizontal_scan: i32,
    pub ceiling_check: i32,
    pub portal_clearance_radius: f32,
    pub max_relays_per_cell: usize,
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            max_rounds: 6,
            floor_height_threshold: 3,
            horizontal_scan: 4,
            ceiling_check: 3,
            portal_clearance_radius: 4.0,
            max_relays_per_cell: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub headroom: i32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self { headroom: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    pub grid_resolution: f32,
    pub obstacle_margin: f32,
    pub clearance: f32,
    pub sample_step: f32,
    pub max_expansions: usize,
    pub min_point_spacing: f32,
    pub z_offset_ratios: Vec<f32>,
    /// Extra cost per direction change, in hundredths of a step.
    pub turn_tie_break: u32,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 1.0,
            obstacle_margin: 1.0,
            clearance: 0.5,
            sample_step: 0.25,
            max_expansions: 20_000,
            min_point_spacing: 0.25,
            z_offset_ratios: vec![0.5, 0.25, 0.75, 0.1, 0.9],
            turn_tie_break: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub room_count: usize,
    pub bounds_width: f32,
    pub bounds_height: f32,
    pub room_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            room_count: 2,
            bounds_width: 220.0,
            bounds_height: 100.0,
            room_spacing: 6.0,
        }
    }
}

impl LevelConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GenError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json(&self) -> Result<String, GenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Tile size of one whole room.
    pub fn room_tile_size(&self) -> IVec2 {
        IVec2::new(
            self.grid.width * self.cell.width,
            self.grid.height * self.cell.height,
        )
    }

    pub fn is_cell_enabled(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && x < self.grid.width
            && y < self.grid.height
            && !self.grid.disabled_cells.contains(&(x, y))
    }

    /// Fails fast on anything the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), GenError> {
        if self.tile_set.trim().is_empty() {
            return Err(GenError::invalid("no tile set configured"));
        }

        let grid = &self.grid;
        if grid.width < 1 || grid.height < 1 || grid.width > 16 || grid.height > 16 {
            return Err(GenError::invalid(format!(
                "room grid must be 1..=16 cells per side, got {}x{}",
                grid.width, grid.height
            )));
        }
        if grid.min_steps < 0 || grid.min_steps > grid.max_steps {
            return Err(GenError::invalid(format!(
                "step range {}..={} is empty",
                grid.min_steps, grid.max_steps
            )));
        }
        if grid.max_path_cells < grid.height as usize {
            return Err(GenError::invalid(format!(
                "max_path_cells {} cannot span {} rows",
                grid.max_path_cells, grid.height
            )));
        }
        if !(0.0..=1.0).contains(&grid.sparse_platform_chance) {
            return Err(GenError::invalid("sparse_platform_chance must be in [0, 1]"));
        }
        if !(0..grid.width).any(|x| self.is_cell_enabled(x, 0)) {
            return Err(GenError::invalid("top row of the room grid has no valid cell"));
        }
        if !(0..grid.width).any(|x| self.is_cell_enabled(x, grid.height - 1)) {
            return Err(GenError::invalid("bottom row of the room grid has no valid cell"));
        }

        let cell = &self.cell;
        if cell.wall_thickness < 1 {
            return Err(GenError::invalid("wall_thickness must be at least 1"));
        }
        let band_width = cell.width - 2 * cell.shaft_wall_width;
        if band_width < 2 {
            return Err(GenError::invalid(format!(
                "cell width {} leaves no shaft between walls of {}",
                cell.width, cell.shaft_wall_width
            )));
        }
        let band_height = cell.height - cell.ceiling_height - cell.floor_height;
        if band_height < 3 {
            return Err(GenError::invalid(format!(
                "cell height {} leaves no corridor between ceiling {} and floor {}",
                cell.height, cell.ceiling_height, cell.floor_height
            )));
        }
        if cell.ceiling_height < 1 || cell.floor_height < 1 {
            return Err(GenError::invalid("ceiling and floor height must be at least 1"));
        }
        if cell.corner_wall_width < 1 || cell.corner_wall_width * 2 >= cell.width {
            return Err(GenError::invalid("corner_wall_width out of range"));
        }

        let cave = &self.cave;
        if !(0.0..=1.0).contains(&cave.fill_density) {
            return Err(GenError::invalid(format!(
                "fill density {} outside [0, 1]",
                cave.fill_density
            )));
        }
        if cave.edge_fill_multiplier < 0.0 || cave.floor_fill_multiplier < 0.0 {
            return Err(GenError::invalid("fill multipliers must not be negative"));
        }
        if cave.carve_max_depth < 0 || cave.carve_min_wavelength <= 0.0 {
            return Err(GenError::invalid("carve parameters must be positive"));
        }
        if cave.carve_max_wavelength < cave.carve_min_wavelength {
            return Err(GenError::invalid("carve wavelength range is empty"));
        }

        let portal = &self.portal;
        if portal.entrance_width < 1 || portal.entrance_width > band_width {
            return Err(GenError::invalid(format!(
                "entrance width {} must fit the shaft band of {}",
                portal.entrance_width, band_width
            )));
        }
        if portal.entrance_height < 1 {
            return Err(GenError::invalid("entrance height must be at least 1"));
        }
        if portal.stub_length <= 0.0 || portal.approach_distance <= portal.stub_length {
            return Err(GenError::invalid(
                "portal approach distance must exceed the stub length",
            ));
        }
        if portal.approach_distance <= self.pathfinding.obstacle_margin {
            return Err(GenError::invalid(
                "portal approach point would sit inside the obstacle margin",
            ));
        }

        if self.jump.jump_force <= 0.0 || self.jump.gravity <= 0.0 {
            return Err(GenError::invalid("jump force and gravity must be positive"));
        }
        if self.jump.max_platform_height_diff < 1 {
            return Err(GenError::invalid("max_platform_height_diff must be at least 1"));
        }
        if self.stairs.safe_step_height < 1 || self.stairs.platform_width < 1 {
            return Err(GenError::invalid("staircase step and width must be at least 1"));
        }

        let path = &self.pathfinding;
        if path.grid_resolution <= 0.0 || path.sample_step <= 0.0 {
            return Err(GenError::invalid(
                "pathfinding resolution and sample step must be positive",
            ));
        }
        if path.obstacle_margin < 0.0 || path.clearance < 0.0 {
            return Err(GenError::invalid("obstacle margin must not be negative"));
        }

        let layout = &self.layout;
        if layout.room_count == 0 {
            return Err(GenError::invalid("room_count must be at least 1"));
        }
        if layout.bounds_width <= 0.0 || layout.bounds_height <= 0.0 {
            return Err(GenError::invalid("layout bounds must be positive"));
        }
        if layout.room_spacing < 0.0 {
            return Err(GenError::invalid("room spacing must not be negative"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(LevelConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_tile_set_fails_fast() {
        let config = LevelConfig {
            tile_set: String::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GenError::ConfigurationInvalid { .. }));
        assert!(err.to_string().contains("tile set"));
    }

    #[test]
    fn density_out_of_range_is_rejected() {
        let mut config = LevelConfig::default();
        config.cave.fill_density = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn safe_reach_follows_jump_force() {
        let mut jump = JumpConfig::default();
        // 14² / 40 = 4.9, * 0.85 = 4.165
        assert_eq!(jump.safe_vertical_reach(), 4);
        jump.jump_force = 8.0;
        // 64 / 40 = 1.6, * 0.85 = 1.36
        assert_eq!(jump.safe_vertical_reach(), 1);
        jump.jump_force = 40.0;
        assert_eq!(jump.safe_vertical_reach(), jump.max_platform_height_diff);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: LevelConfig =
            serde_json::from_str(r#"{ "seed": 42, "cave": { "fill_density": 0.3 } }"#).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.cave.fill_density, 0.3);
        assert_eq!(config.cave.smoothing_iterations, 2);
        assert_eq!(config.grid.width, 4);
    }
}
