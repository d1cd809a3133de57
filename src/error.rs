use bevy::math::{IVec2, Vec2};
use serde::Serialize;
use thiserror::Error;

use crate::grid::GridError;

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    /// A required input is missing or a parameter is out of range.
    #[error("invalid configuration: {reason}")]
    ConfigurationInvalid { reason: String },

    /// The requested rooms do not fit inside the layout bounds.
    #[error(
        "layout infeasible: {room_count} rooms need {required_width}x{required_height} tiles, \
         bounds are {available_width}x{available_height}"
    )]
    LayoutInfeasible {
        room_count: usize,
        required_width: f32,
        required_height: f32,
        available_width: f32,
        available_height: f32,
    },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        GenError::ConfigurationInvalid {
            reason: reason.into(),
        }
    }
}

/// Non-fatal failures. The run continues and these are reported alongside the output.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum GenWarning {
    #[error("no corridor found between room {from_room} and room {to_room}")]
    PathfindingFailure { from_room: usize, to_room: usize },

    #[error("room {room}: {clusters} platform clusters still unreachable after {rounds} rounds")]
    AccessibilityUnresolvable {
        room: usize,
        clusters: usize,
        rounds: usize,
    },

    #[error("room {room}: no standable tile near {anchor}, using region center {fallback}")]
    NoStandablePoint {
        room: usize,
        anchor: Vec2,
        fallback: Vec2,
    },

    #[error("room {room}: relay cap reached in cell {cell}")]
    RelayCapReached { room: usize, cell: IVec2 },
}
