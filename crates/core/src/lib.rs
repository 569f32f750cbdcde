//! Firebreak game core
//!
//! A wildfire cellular automaton on a procedurally generated island, the
//! controlled-burn input that lets the player fight it, and a small renderer
//! that draws the terrain and camera-facing sprites with an optional
//! low-resolution retro look.
//!
//! ## Frame order
//!
//! Every frame runs input, queued ignitions, fixed-step fire ticks, the win
//! or loss check, then sprite projection and drawing. Nothing is interleaved:
//! rendering only ever reads committed fire state.
//!
//! ```rust,ignore
//! use firebreak_core::{Framebuffer, GameConfig, GameLoop, IslandGenerator, SoftwareBackend};
//! use firebreak_core::grid::TerrainGenerator;
//!
//! let config = GameConfig::default();
//! let terrain = IslandGenerator::default().generate(config.seed, 80, 45)?;
//! let mut game = GameLoop::new(config, terrain, SoftwareBackend::default());
//! let mut surface = Framebuffer::new(1280, 720);
//! let frame = game.run_frame(1.0 / 60.0, &[], &mut surface)?;
//! ```

pub mod config;
pub mod core_types;
pub mod error;
pub mod game;
pub mod grid;
pub mod projection;
pub mod render;
pub mod simulation;

pub use config::{
    AudioMix, ClassTable, DifficultyMode, FireConfig, GameConfig, IgnitionConfig, Neighborhood,
    OutbreakConfig, OutcomePolicy, RetroConfig, SpreadCurve, SpriteConfig,
};
pub use core_types::{CellState, CombustionState, GridCoord, Rgba, TerrainClass, Vec3};
pub use error::{RenderError, SimError};
pub use game::{FrameOutput, GameLoop};
pub use grid::{IslandGenerator, TerrainGrid, WorldMapper};
pub use projection::{project, BillboardInstance, FacingMode, SpriteKind};
pub use render::{Framebuffer, RenderBackend, RenderPipeline, SoftwareBackend};
pub use simulation::{
    CameraPose, FireAutomaton, FireState, FireStats, GameState, IgnitionController, InputEvent,
    Key, Outcome, Session, TickOutcome,
};

#[cfg(feature = "gpu")]
pub use render::{GpuSurface, WgpuBackend};
