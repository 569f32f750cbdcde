//! Gameplay and rendering configuration.
//!
//! Every struct implements `Default` with the shipped balance values and
//! derives serde with `#[serde(default)]`, so a config file only needs to name
//! the values it overrides.

pub mod difficulty;

pub use difficulty::DifficultyMode;

use crate::core_types::TerrainClass;
use serde::{Deserialize, Serialize};

/// Which neighbours count when testing for spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Neighborhood {
    /// 4-connected (N, E, S, W)
    VonNeumann,
    /// 8-connected, includes diagonals
    #[default]
    Moore,
}

impl Neighborhood {
    const VON_NEUMANN_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
    const MOORE_OFFSETS: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// Neighbour offsets `(dx, dz)` in a fixed order
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Neighborhood::VonNeumann => &Self::VON_NEUMANN_OFFSETS,
            Neighborhood::Moore => &Self::MOORE_OFFSETS,
        }
    }
}

/// How burning-neighbour count and flammability combine into a catch probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpreadCurve {
    /// Each burning neighbour gets one independent chance of
    /// `per_neighbor * flammability`: `p = 1 - (1 - per_neighbor * f)^n`
    IndependentTrials { per_neighbor: f32 },
    /// `p = min(1, per_neighbor * f * n)`
    Linear { per_neighbor: f32 },
    /// `p` whenever at least one neighbour burns, ignoring flammability
    Constant { probability: f32 },
}

impl Default for SpreadCurve {
    fn default() -> Self {
        SpreadCurve::IndependentTrials { per_neighbor: 0.39 }
    }
}

impl SpreadCurve {
    /// Catch probability for a cell with `burning` burning neighbours.
    ///
    /// Always 0 when `burning == 0` or `flammability <= 0`.
    pub fn probability(&self, burning: u32, flammability: f32) -> f32 {
        if burning == 0 || flammability <= 0.0 {
            return 0.0;
        }
        let p = match *self {
            SpreadCurve::IndependentTrials { per_neighbor } => {
                let miss = (1.0 - per_neighbor * flammability).clamp(0.0, 1.0);
                1.0 - miss.powi(burning as i32)
            }
            SpreadCurve::Linear { per_neighbor } => per_neighbor * flammability * burning as f32,
            SpreadCurve::Constant { probability } => probability,
        };
        p.clamp(0.0, 1.0)
    }
}

/// One value per terrain class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassTable {
    pub water: f32,
    pub grassland: f32,
    pub forest: f32,
    pub field: f32,
    pub house: f32,
}

impl ClassTable {
    /// Same value for every flammable class, 0 for water
    pub const fn uniform(value: f32) -> Self {
        Self {
            water: 0.0,
            grassland: value,
            forest: value,
            field: value,
            house: value,
        }
    }

    #[inline]
    pub fn get(&self, class: TerrainClass) -> f32 {
        match class {
            TerrainClass::Water => self.water,
            TerrainClass::Grassland => self.grassland,
            TerrainClass::Forest => self.forest,
            TerrainClass::Field => self.field,
            TerrainClass::House => self.house,
        }
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// Fire automaton rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    pub neighborhood: Neighborhood,
    pub spread_curve: SpreadCurve,
    /// Flammability weight per class (water must stay 0)
    pub flammability: ClassTable,
    /// Initial fuel per class
    pub fuel: ClassTable,
    /// Fuel consumed per tick while burning
    pub burn_rate: f32,
    /// Ticks spent igniting before a cell burns
    pub ignition_delay_ticks: u32,
    /// Flammability added to cells orthogonally adjacent to a house
    pub house_adjacency_bonus: f32,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Moore,
            spread_curve: SpreadCurve::default(),
            flammability: ClassTable {
                water: 0.0,
                grassland: 0.4,
                forest: 0.8,
                field: 0.3,
                house: 0.9,
            },
            // ~7 seconds of burning for forest at the normal tick rate
            fuel: ClassTable {
                water: 0.0,
                grassland: 6.0,
                forest: 12.0,
                field: 6.0,
                house: 16.0,
            },
            burn_rate: 1.0,
            ignition_delay_ticks: 1,
            house_adjacency_bonus: 0.05,
        }
    }
}

/// Player controlled burns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnitionConfig {
    /// Chebyshev radius of the forced neighbourhood around the target
    pub radius: u32,
    /// Leave houses in the neighbourhood untouched
    pub spare_houses: bool,
    /// Fraction of the class fuel given to controlled-burn cells
    pub controlled_burn_fuel_factor: f32,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            radius: 1,
            spare_houses: true,
            controlled_burn_fuel_factor: 0.5,
        }
    }
}

/// Wildfire seeding at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutbreakConfig {
    /// Number of separate fire starts on the map edge
    pub starts: u32,
    /// Placement attempts per start before giving up
    pub attempts: u32,
    /// Inclusive range of extra cells lit around each start
    pub extra_cells_min: u32,
    pub extra_cells_max: u32,
}

impl Default for OutbreakConfig {
    fn default() -> Self {
        Self {
            starts: 2,
            attempts: 100,
            extra_cells_min: 1,
            extra_cells_max: 3,
        }
    }
}

/// Win/loss thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomePolicy {
    /// Loss as soon as the unburnt burnable fraction drops below this
    pub min_burnable_fraction: f32,
    /// Largest fraction of houses that may be lost for a win
    pub max_house_loss_fraction: f32,
    /// A win also needs at least one house standing (when the map has houses)
    pub require_surviving_house: bool,
}

impl Default for OutcomePolicy {
    fn default() -> Self {
        Self {
            min_burnable_fraction: 0.15,
            max_house_loss_fraction: 1.0,
            require_surviving_house: true,
        }
    }
}

/// Billboard derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Max random offset of trees inside their cell, in cells
    pub tree_jitter: f32,
    /// Max random offset of grass tufts inside their cell, in cells
    pub grass_jitter: f32,
    /// Ticks per animation frame for burning sprites
    pub ticks_per_frame: u32,
    /// Ticks an ash patch stays visible on grass and field cells
    pub ash_visible_ticks: u64,
    /// Colour multiplier applied to grass tufts
    pub grass_tint: [f32; 4],
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            tree_jitter: 0.3,
            grass_jitter: 0.4,
            ticks_per_frame: 1,
            ash_visible_ticks: 6,
            grass_tint: [0.7, 0.7, 0.7, 1.0],
        }
    }
}

/// Low-resolution ("PSX") post-process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetroConfig {
    pub enabled: bool,
    pub low_res_width: u32,
    pub low_res_height: u32,
}

impl Default for RetroConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            low_res_width: 640,
            low_res_height: 360,
        }
    }
}

/// Fire sound mixing curve handed to the audio collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMix {
    /// Beyond this distance the fire is silent (world units)
    pub max_hear_distance: f32,
    pub max_fire_volume: f32,
    pub master_volume: f32,
    /// Burning cell count at which the fire is at full intensity
    pub cells_for_max_volume: u32,
}

impl Default for AudioMix {
    fn default() -> Self {
        Self {
            max_hear_distance: 100.0,
            max_fire_volume: 0.6,
            master_volume: 0.7,
            cells_for_max_volume: 150,
        }
    }
}

impl AudioMix {
    /// Fire loop volume in [0, 1] from the distance to the nearest burning
    /// cell and the number of burning cells
    pub fn fire_volume(&self, nearest_distance: Option<f32>, burning_cells: usize) -> f32 {
        let Some(distance) = nearest_distance else {
            return 0.0;
        };
        if burning_cells == 0 || distance >= self.max_hear_distance {
            return 0.0;
        }
        let distance_factor = 1.0 - distance / self.max_hear_distance.max(f32::EPSILON);
        let presence = (burning_cells as f32 / self.cells_for_max_volume.max(1) as f32).min(1.0);
        (distance_factor * presence * self.max_fire_volume * self.master_volume).clamp(0.0, 1.0)
    }
}

/// Top-level configuration for a game session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for fire rolls and outbreak placement
    pub seed: u64,
    /// Simulation ticks per second at `Normal` difficulty
    pub tick_rate_hz: f32,
    /// Upper bound on ticks run in a single frame
    pub max_ticks_per_frame: u32,
    /// World units per grid cell
    pub cell_size: f32,
    pub difficulty: DifficultyMode,
    pub fire: FireConfig,
    pub ignition: IgnitionConfig,
    pub outbreak: OutbreakConfig,
    pub outcome: OutcomePolicy,
    pub sprites: SpriteConfig,
    pub retro: RetroConfig,
    pub audio: AudioMix,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            // One spread step every 35 frames at 60 fps
            tick_rate_hz: 60.0 / 35.0,
            max_ticks_per_frame: 8,
            cell_size: 1.0,
            difficulty: DifficultyMode::default(),
            fire: FireConfig::default(),
            ignition: IgnitionConfig::default(),
            outbreak: OutbreakConfig::default(),
            outcome: OutcomePolicy::default(),
            sprites: SpriteConfig::default(),
            retro: RetroConfig::default(),
            audio: AudioMix::default(),
        }
    }
}

impl GameConfig {
    /// Tick rate after difficulty scaling
    pub fn effective_tick_rate(&self) -> f32 {
        self.difficulty.apply_to_tick_rate(self.tick_rate_hz)
    }

    /// Seconds per simulation tick after difficulty scaling
    pub fn tick_interval(&self) -> f32 {
        1.0 / self.effective_tick_rate().max(f32::EPSILON)
    }
}
