//! Fire simulation and the game session around it
//!
//! `FireAutomaton` owns the fire state and the tick rules, `IgnitionController`
//! turns clicks into controlled burns, and `Session` drives both on a fixed
//! step behind the game state machine.

pub mod action_queue;
pub mod automaton;
pub mod camera;
pub mod ignition;
pub mod outbreak;
pub mod session;

pub use action_queue::{ActionQueue, ExecutedRequest, IgnitionRequest};
pub use automaton::{FireAutomaton, FireState, FireStats, IgnitionKind, TickOutcome, TickReport};
pub use camera::{CameraPose, OrbitCamera};
pub use ignition::{pick_ground, IgnitionController, IgnitionReport};
pub use outbreak::{seed_outbreak, OutbreakReport};
pub use session::{AudioSignals, FrameReport, GameState, InputEvent, Key, Outcome, Session};
