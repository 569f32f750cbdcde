//! Difficulty mode scaling for gameplay balance
//!
//! Difficulty only changes how fast the fire advances relative to real time.
//! The per-tick rules stay identical, so a seeded run produces the same fire
//! history at every difficulty, just faster or slower.

use serde::{Deserialize, Serialize};

/// Difficulty mode for gameplay scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifficultyMode {
    /// One spread step every 55 frames at 60 fps
    Easy,
    /// One spread step every 35 frames at 60 fps (baseline)
    #[default]
    Normal,
    /// One spread step every 20 frames at 60 fps
    Hard,
}

impl DifficultyMode {
    /// Frames between spread steps at 60 fps
    pub fn spread_delay_frames(&self) -> u32 {
        match self {
            DifficultyMode::Easy => 55,
            DifficultyMode::Normal => 35,
            DifficultyMode::Hard => 20,
        }
    }

    /// Get tick rate multiplier relative to `Normal`
    pub fn tick_rate_multiplier(&self) -> f32 {
        DifficultyMode::Normal.spread_delay_frames() as f32 / self.spread_delay_frames() as f32
    }

    /// Apply difficulty scaling to a base tick rate
    pub fn apply_to_tick_rate(&self, base_hz: f32) -> f32 {
        base_hz * self.tick_rate_multiplier()
    }

    /// Next mode in menu order, wrapping around
    pub fn cycle(self) -> Self {
        match self {
            DifficultyMode::Easy => DifficultyMode::Normal,
            DifficultyMode::Normal => DifficultyMode::Hard,
            DifficultyMode::Hard => DifficultyMode::Easy,
        }
    }
}
