//! Per-cell classification and combustion state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static terrain classification of a grid cell.
///
/// Assigned once by terrain generation and never changed during play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainClass {
    /// Open water. Never burns and blocks fire spread.
    Water,
    /// Short grass, burns fast with little fuel.
    Grassland,
    /// Forest, the main fuel source.
    Forest,
    /// Farmland.
    Field,
    /// A house the player is trying to protect.
    House,
}

impl TerrainClass {
    /// All classes, in declaration order.
    pub const ALL: [TerrainClass; 5] = [
        TerrainClass::Water,
        TerrainClass::Grassland,
        TerrainClass::Forest,
        TerrainClass::Field,
        TerrainClass::House,
    ];

    /// Whether fire can ever enter a cell of this class
    #[inline]
    pub const fn is_flammable(self) -> bool {
        !matches!(self, TerrainClass::Water)
    }

    /// Map character used by [`crate::grid::TerrainGrid::from_ascii`]
    pub const fn symbol(self) -> char {
        match self {
            TerrainClass::Water => 'W',
            TerrainClass::Grassland => 'G',
            TerrainClass::Forest => 'F',
            TerrainClass::Field => '.',
            TerrainClass::House => 'H',
        }
    }

    /// Inverse of [`TerrainClass::symbol`]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.symbol() == symbol)
    }
}

impl fmt::Display for TerrainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerrainClass::Water => "water",
            TerrainClass::Grassland => "grassland",
            TerrainClass::Forest => "forest",
            TerrainClass::Field => "field",
            TerrainClass::House => "house",
        };
        f.write_str(name)
    }
}

/// Combustion state of a cell.
///
/// Transitions only move forward: `Unburnt -> Igniting -> Burning -> Ash`.
/// Controlled burns skip `Igniting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombustionState {
    #[default]
    Unburnt,
    /// Caught but not yet burning (catch delay)
    Igniting,
    Burning,
    /// Terminal
    Ash,
}

impl CombustionState {
    /// Whether the cell can still change state on its own
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, CombustionState::Igniting | CombustionState::Burning)
    }
}

impl fmt::Display for CombustionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CombustionState::Unburnt => "unburnt",
            CombustionState::Igniting => "igniting",
            CombustionState::Burning => "burning",
            CombustionState::Ash => "ash",
        };
        f.write_str(name)
    }
}

/// Integer grid coordinate.
///
/// Signed so that points derived from off-map world positions can be carried
/// around and rejected with a proper error instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

impl GridCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Offset by `(dx, dz)`
    #[inline]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Mutable combustion data for one cell.
///
/// Age-in-state is not stored: it is `tick - since_tick`, where `tick` is the
/// owning automaton's tick counter. This keeps terminal cells bit-for-bit
/// unchanged across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellState {
    pub combustion: CombustionState,
    /// Fuel remaining, only decremented while burning
    pub fuel: f32,
    /// Automaton tick at which the current state was entered
    pub since_tick: u64,
}

impl CellState {
    /// Fresh unburnt cell holding `fuel`
    pub const fn unburnt(fuel: f32) -> Self {
        Self {
            combustion: CombustionState::Unburnt,
            fuel,
            since_tick: 0,
        }
    }

    /// Ticks spent in the current state as of `tick`
    #[inline]
    pub const fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.since_tick)
    }
}
