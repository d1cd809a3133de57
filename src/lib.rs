//! Procedural 2D platformer level generation: a critical path through a room grid,
//! cave terrain rasterized per cell, corridors routed between rooms, platform
//! reachability repair and spawn/exit placement.

pub mod config;
pub mod direction;
pub mod distance;
pub mod error;
pub mod grid;
pub mod layout;
pub mod level;
pub mod map;
pub mod map_builders;
pub mod pathfinding;
pub mod plugin;
pub mod rng;
pub mod room_graph;
pub mod shapes;
pub mod spawn;

pub use config::{GenerationStrategy, LevelConfig};
pub use error::{GenError, GenWarning};
pub use level::{generate, CorridorPath, GeneratedLevel, GeneratedRoom, LevelGenerator};
pub use plugin::LevelGenPlugin;
