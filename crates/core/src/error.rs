//! Error types for simulation queries, ignition requests and rendering.
//!
//! All of these are recoverable: callers log them and carry on with the next
//! input or frame. A quiescent simulation is reported through
//! [`crate::simulation::TickOutcome::Quiescent`], not through an error.

use crate::core_types::{CombustionState, GridCoord, TerrainClass};
use std::fmt;

/// Errors raised by grid lookups and ignition validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Coordinate outside the grid
    OutOfBounds {
        coord: GridCoord,
        width: usize,
        height: usize,
    },
    /// Ignition aimed at a cell that can never burn (water)
    InvalidTarget {
        coord: GridCoord,
        class: TerrainClass,
    },
    /// Ignition aimed at a cell that is no longer unburnt
    AlreadyBurning {
        coord: GridCoord,
        state: CombustionState,
    },
    /// Grid construction with inconsistent dimensions or data lengths
    InvalidDimensions { message: String },
    /// Map text containing a character that names no terrain class
    UnknownSymbol { symbol: char, coord: GridCoord },
}

impl SimError {
    /// Short machine-friendly name, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            SimError::OutOfBounds { .. } => "out_of_bounds",
            SimError::InvalidTarget { .. } => "invalid_target",
            SimError::AlreadyBurning { .. } => "already_burning",
            SimError::InvalidDimensions { .. } => "invalid_dimensions",
            SimError::UnknownSymbol { .. } => "unknown_symbol",
        }
    }

    pub(crate) fn invalid_dimensions(message: impl Into<String>) -> Self {
        SimError::InvalidDimensions {
            message: message.into(),
        }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::OutOfBounds {
                coord,
                width,
                height,
            } => write!(f, "coordinate {coord} is outside the {width}x{height} grid"),
            SimError::InvalidTarget { coord, class } => {
                write!(f, "cell {coord} is {class} and cannot be ignited")
            }
            SimError::AlreadyBurning { coord, state } => {
                write!(f, "cell {coord} is already {state}")
            }
            SimError::InvalidDimensions { message } => {
                write!(f, "invalid grid dimensions: {message}")
            }
            SimError::UnknownSymbol { symbol, coord } => {
                write!(f, "unknown terrain symbol {symbol:?} at {coord}")
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Errors raised by render backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The low-resolution off-screen target could not be created
    TargetAllocation {
        width: u32,
        height: u32,
        reason: String,
    },
    /// A frame was requested while no off-screen target exists
    MissingOffscreen,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TargetAllocation {
                width,
                height,
                reason,
            } => write!(
                f,
                "failed to allocate {width}x{height} off-screen target: {reason}"
            ),
            RenderError::MissingOffscreen => f.write_str("no off-screen target is allocated"),
        }
    }
}

impl std::error::Error for RenderError {}
