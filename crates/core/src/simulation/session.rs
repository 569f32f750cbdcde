//! Game session: state machine, fixed-step ticking and progress signals.
//!
//! [`Session::advance`] is the whole simulation side of a frame, in this order:
//! 1. input events (camera, keys, click capture)
//! 2. queued ignitions, validated against the current state
//! 3. fixed-step fire ticks from the time accumulator
//! 4. win/loss check
//! 5. stats and audio signals for the frame
//!
//! Rendering reads the session only after `advance` returns.

use crate::config::{DifficultyMode, GameConfig};
use crate::core_types::{CombustionState, Vec3};
use crate::error::SimError;
use crate::grid::{TerrainGenerator, TerrainGrid, WorldMapper};
use crate::simulation::action_queue::{ActionQueue, ExecutedRequest, IgnitionRequest};
use crate::simulation::automaton::{FireAutomaton, FireState, FireStats, TickOutcome};
use crate::simulation::camera::{CameraPose, OrbitCamera};
use crate::simulation::ignition::IgnitionController;
use crate::simulation::outbreak::{seed_outbreak, OutbreakReport};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, trace, warn};

/// How an ended session went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
}

/// Top-level game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Menu,
    Playing,
    Paused,
    Ended(Outcome),
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameState::Menu => f.write_str("menu"),
            GameState::Playing => f.write_str("playing"),
            GameState::Paused => f.write_str("paused"),
            GameState::Ended(Outcome::Win) => f.write_str("won"),
            GameState::Ended(Outcome::Loss) => f.write_str("lost"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// Toggle between playing and paused
    Pause,
    /// Start over on the same terrain (from paused or ended)
    Restart,
    ToggleRetroEffect,
    /// Leave the menu
    StartGame,
}

/// One input event delivered by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Click on the ground at a world position
    Click { world_point: Vec3 },
    /// Mouse drag in pixels
    Drag { delta: (f32, f32) },
    /// Scroll steps, positive zooms in
    Scroll { delta: f32 },
    KeyPress(Key),
}

/// What the audio layer needs each frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioSignals {
    /// XZ distance from the camera eye to the nearest burning cell
    pub nearest_burning_distance: Option<f32>,
    pub burning_cells: usize,
    /// Suggested fire loop volume from the configured mix
    pub fire_volume: f32,
}

/// Summary of one [`Session::advance`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub state: GameState,
    pub ticks_run: u32,
    pub ignitions_applied: usize,
    pub ignitions_rejected: usize,
    pub clicks_dropped: usize,
    pub houses_lost_this_frame: usize,
    /// The player asked to flip the low-resolution effect
    pub toggle_retro_effect: bool,
    pub stats: FireStats,
    pub audio: AudioSignals,
    pub score: u32,
}

/// A single game on one terrain
#[derive(Debug)]
pub struct Session {
    config: GameConfig,
    terrain: TerrainGrid,
    mapper: WorldMapper,
    automaton: FireAutomaton,
    ignition: IgnitionController,
    actions: ActionQueue,
    orbit: OrbitCamera,
    camera_override: Option<CameraPose>,
    state: GameState,
    accumulator: f32,
    /// Something has burned since play began, so quiescence ends the game
    fire_started: bool,
    frame: u64,
    restarts: u64,
    outbreak: OutbreakReport,
}

impl Session {
    /// New session in the menu state on `terrain`
    #[must_use]
    pub fn new(config: GameConfig, terrain: TerrainGrid) -> Self {
        let mapper = WorldMapper::for_terrain(&terrain, config.cell_size);
        let automaton = FireAutomaton::new(&terrain, config.fire.clone(), config.seed);
        let ignition = IgnitionController::new(config.ignition.clone());
        info!(
            width = terrain.width(),
            height = terrain.height(),
            houses = terrain.house_count(),
            seed = config.seed,
            difficulty = ?config.difficulty,
            "Session created"
        );
        Self {
            config,
            terrain,
            mapper,
            automaton,
            ignition,
            actions: ActionQueue::default(),
            orbit: OrbitCamera::default(),
            camera_override: None,
            state: GameState::Menu,
            accumulator: 0.0,
            fire_started: false,
            frame: 0,
            restarts: 0,
            outbreak: OutbreakReport::default(),
        }
    }

    /// Generate terrain with `generator` and open a session on it
    pub fn generate<G: TerrainGenerator>(
        config: GameConfig,
        generator: &G,
        width: usize,
        height: usize,
    ) -> Result<Self, SimError> {
        let terrain = generator.generate(config.seed, width, height)?;
        Ok(Self::new(config, terrain))
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    pub fn fire_state(&self) -> &FireState {
        self.automaton.state()
    }

    pub fn stats(&self) -> &FireStats {
        self.automaton.stats()
    }

    pub fn mapper(&self) -> &WorldMapper {
        &self.mapper
    }

    pub fn outbreak(&self) -> &OutbreakReport {
        &self.outbreak
    }

    /// Requests processed in the last frame, with their outcome
    pub fn executed_ignitions(&self) -> &[ExecutedRequest] {
        self.actions.executed_this_frame()
    }

    pub fn burns_used(&self) -> u32 {
        self.ignition.burns_used()
    }

    /// Houses not touched by fire
    pub fn houses_saved(&self) -> usize {
        self.stats().houses_standing
    }

    pub fn forest_fraction(&self) -> f32 {
        self.stats().forest_fraction()
    }

    /// `houses_saved * 100 + land_saved_percent * 10`
    pub fn score(&self) -> u32 {
        let percent = self.stats().burnable_fraction() * 100.0;
        (self.houses_saved() as f32 * 100.0 + percent * 10.0) as u32
    }

    /// The pose rendering should use this frame
    pub fn camera(&self) -> CameraPose {
        self.camera_override.unwrap_or_else(|| self.orbit.pose())
    }

    pub fn orbit(&self) -> &OrbitCamera {
        &self.orbit
    }

    /// Replace the orbit camera with an externally owned pose, `None` to go back
    pub fn set_camera(&mut self, pose: Option<CameraPose>) {
        self.camera_override = pose;
    }

    pub fn set_difficulty(&mut self, difficulty: DifficultyMode) {
        if self.config.difficulty != difficulty {
            info!(?difficulty, "Difficulty changed");
            self.config.difficulty = difficulty;
        }
    }

    fn transition(&mut self, next: GameState) {
        if self.state != next {
            info!(from = %self.state, to = %next, frame = self.frame, "Game state changed");
            self.state = next;
        }
    }

    fn session_seed(&self) -> u64 {
        self.config.seed.wrapping_add(self.restarts)
    }

    /// Fresh fire state with a new outbreak, then playing
    fn begin_play(&mut self) {
        let seed = self.session_seed();
        self.automaton = FireAutomaton::new(&self.terrain, self.config.fire.clone(), seed);
        self.ignition.reset();
        self.actions.clear();
        self.accumulator = 0.0;
        let mut rng = StdRng::seed_from_u64(seed);
        self.outbreak = seed_outbreak(&mut self.automaton, &self.terrain, &self.config.outbreak, &mut rng);
        self.fire_started = !self.automaton.is_quiescent();
        if !self.fire_started {
            debug!("No outbreak lit, waiting for the first burn");
        }
        self.transition(GameState::Playing);
    }

    fn restart(&mut self) {
        self.restarts += 1;
        info!(restarts = self.restarts, "Restarting session");
        self.begin_play();
    }

    fn handle_event(&mut self, event: &InputEvent, report: &mut FrameReport) {
        match *event {
            InputEvent::Click { world_point } => {
                if self.state == GameState::Playing {
                    self.actions.submit(IgnitionRequest {
                        position: world_point,
                        camera: self.camera(),
                        frame: self.frame,
                    });
                } else {
                    trace!(state = %self.state, "Click dropped outside play");
                    report.clicks_dropped += 1;
                }
            }
            InputEvent::Drag { delta } => self.orbit.apply_drag(delta),
            InputEvent::Scroll { delta } => self.orbit.apply_scroll(delta),
            InputEvent::KeyPress(key) => match (key, self.state) {
                (Key::StartGame, GameState::Menu) => self.begin_play(),
                (Key::Pause, GameState::Playing) => self.transition(GameState::Paused),
                (Key::Pause, GameState::Paused) => self.transition(GameState::Playing),
                (Key::Restart, GameState::Paused | GameState::Ended(_)) => self.restart(),
                (Key::ToggleRetroEffect, _) => report.toggle_retro_effect = !report.toggle_retro_effect,
                (key, state) => trace!(?key, %state, "Key ignored in this state"),
            },
        }
    }

    fn apply_ignitions(&mut self, report: &mut FrameReport) {
        if self.state != GameState::Playing {
            let dropped = self.actions.discard_pending();
            if dropped > 0 {
                trace!(dropped, state = %self.state, "Pending ignitions dropped");
                report.clicks_dropped += dropped;
            }
            return;
        }
        for request in self.actions.take_pending() {
            let result = self.ignition.request_ignition(
                &mut self.automaton,
                &self.terrain,
                &self.mapper,
                &request.position,
                &request.camera,
            );
            match &result {
                Ok(_) => {
                    self.fire_started = true;
                    report.ignitions_applied += 1;
                }
                Err(err) => {
                    warn!(error = %err, kind = err.kind(), "Ignition rejected");
                    report.ignitions_rejected += 1;
                }
            }
            self.actions.mark_executed(request, result);
        }
    }

    /// Outcome if the session should end now
    fn evaluate(&self) -> Option<Outcome> {
        let stats = self.stats();
        let policy = &self.config.outcome;
        let burnable = stats.burnable_fraction();
        if burnable < policy.min_burnable_fraction
            || (stats.burnable_total > 0 && stats.burnable_remaining == 0)
        {
            return Some(Outcome::Loss);
        }
        // a map that never caught keeps playing until the player lights it
        if !self.fire_started || !self.automaton.is_quiescent() {
            return None;
        }

        let houses_ok = if stats.houses_total == 0 {
            true
        } else {
            let lost_fraction = stats.houses_lost as f32 / stats.houses_total as f32;
            lost_fraction <= policy.max_house_loss_fraction
                && (!policy.require_surviving_house || stats.houses_standing > 0)
        };
        Some(if houses_ok { Outcome::Win } else { Outcome::Loss })
    }

    fn run_ticks(&mut self, dt: f32, report: &mut FrameReport) {
        self.accumulator += dt;
        let interval = self.config.tick_interval();
        while self.accumulator >= interval && report.ticks_run < self.config.max_ticks_per_frame {
            match self.automaton.tick(&self.terrain) {
                TickOutcome::Advanced(tick) => {
                    self.accumulator -= interval;
                    report.ticks_run += 1;
                    report.houses_lost_this_frame += tick.houses_lost;
                }
                TickOutcome::Quiescent => break,
            }
            if self.evaluate() == Some(Outcome::Loss) {
                break;
            }
        }
        let backlog = interval * self.config.max_ticks_per_frame as f32;
        if self.accumulator > backlog {
            debug!(dropped = self.accumulator - backlog, "Tick backlog clamped");
            self.accumulator = backlog;
        }
    }

    fn audio_signals(&self) -> AudioSignals {
        let eye = self.camera().eye;
        let state = self.automaton.state();
        let nearest = state
            .cells()
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.combustion == CombustionState::Burning)
            .map(|(idx, _)| {
                let center = self.mapper.cell_center(self.terrain.coord_of(idx), 0.0);
                (center.x - eye.x).hypot(center.z - eye.z)
            })
            .reduce(f32::min);
        let burning_cells = self.stats().burning;
        AudioSignals {
            nearest_burning_distance: nearest,
            burning_cells,
            fire_volume: self.config.audio.fire_volume(nearest, burning_cells),
        }
    }

    /// Advance the session by `dt` seconds of real time.
    ///
    /// Negative or non-finite `dt` counts as zero.
    pub fn advance(&mut self, dt: f32, events: &[InputEvent]) -> FrameReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.frame += 1;
        self.actions.begin_frame();

        let mut report = FrameReport {
            frame: self.frame,
            state: self.state,
            ticks_run: 0,
            ignitions_applied: 0,
            ignitions_rejected: 0,
            clicks_dropped: 0,
            houses_lost_this_frame: 0,
            toggle_retro_effect: false,
            stats: *self.stats(),
            audio: AudioSignals::default(),
            score: 0,
        };

        for event in events {
            self.handle_event(event, &mut report);
        }
        self.apply_ignitions(&mut report);

        if self.state == GameState::Playing {
            self.run_ticks(dt, &mut report);
            if let Some(outcome) = self.evaluate() {
                let stats = *self.stats();
                info!(
                    ?outcome,
                    houses_saved = stats.houses_standing,
                    houses_total = stats.houses_total,
                    burns_used = self.burns_used(),
                    score = self.score(),
                    "Session ended"
                );
                self.transition(GameState::Ended(outcome));
            }
        }

        report.state = self.state;
        report.stats = *self.stats();
        report.audio = self.audio_signals();
        report.score = self.score();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassTable, FireConfig, OutbreakConfig, SpreadCurve};
    use crate::core_types::{GridCoord, TerrainClass};

    /// No random outbreak, certain spread, one tick per 1/8 s
    fn quiet_config() -> GameConfig {
        GameConfig {
            tick_rate_hz: 8.0,
            max_ticks_per_frame: 4,
            outbreak: OutbreakConfig {
                starts: 0,
                ..Default::default()
            },
            fire: FireConfig {
                spread_curve: SpreadCurve::Constant { probability: 1.0 },
                fuel: ClassTable::uniform(2.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn start(config: GameConfig, map: &str) -> Session {
        let terrain = TerrainGrid::from_ascii(map).unwrap();
        let mut session = Session::new(config, terrain);
        session.advance(0.0, &[InputEvent::KeyPress(Key::StartGame)]);
        session
    }

    fn click(session: &Session, x: i32, z: i32) -> InputEvent {
        InputEvent::Click {
            world_point: session.mapper().cell_center(GridCoord::new(x, z), 0.0),
        }
    }

    #[test]
    fn test_menu_to_playing() {
        let terrain = TerrainGrid::filled(10, 10, TerrainClass::Forest).unwrap();
        let mut session = Session::new(GameConfig::default(), terrain);
        assert_eq!(session.state(), GameState::Menu);
        let report = session.advance(1.0, &[]);
        assert_eq!(report.ticks_run, 0);
        session.advance(0.0, &[InputEvent::KeyPress(Key::StartGame)]);
        assert_eq!(session.state(), GameState::Playing);
        assert_eq!(session.outbreak().starts.len(), 2);
    }

    #[test]
    fn test_fixed_step_is_frame_rate_independent() {
        let map = "FFFFFFFF\nFFFFFFFF\nFFFFFFFF\nFFFFFFFF";
        let mut coarse = start(quiet_config(), map);
        let mut fine = start(quiet_config(), map);
        let ignite = click(&coarse, 0, 0);
        coarse.advance(0.0, &[ignite]);
        fine.advance(0.0, &[ignite]);

        for _ in 0..4 {
            coarse.advance(0.25, &[]);
        }
        for _ in 0..32 {
            fine.advance(0.03125, &[]);
        }
        assert_eq!(coarse.fire_state(), fine.fire_state());
    }

    #[test]
    fn test_tick_cap_keeps_remaining_time() {
        let mut session = start(quiet_config(), "FFFFFFFFFF");
        session.advance(0.0, &[click(&session, 0, 0)]);
        let report = session.advance(1.0, &[]);
        assert_eq!(report.ticks_run, 4);
        // the backlog drains on the next frames
        let report = session.advance(0.0, &[]);
        assert_eq!(report.ticks_run, 4);
    }

    #[test]
    fn test_slow_frames_do_not_build_a_backlog() {
        let mut session = start(quiet_config(), "FFFFFFFFFFFFFFFFFFFF");
        session.advance(0.0, &[click(&session, 0, 0)]);
        // ten seconds behind, but at most one frame's worth of ticks carries over
        assert_eq!(session.advance(10.0, &[]).ticks_run, 4);
        assert_eq!(session.advance(0.0, &[]).ticks_run, 4);
        assert_eq!(session.advance(0.0, &[]).ticks_run, 0);
    }

    #[test]
    fn test_session_without_fire_keeps_playing() {
        let mut session = start(quiet_config(), "FFFF\nFFFF");
        assert_eq!(session.state(), GameState::Playing);
        assert!(session.outbreak().starts.is_empty());
        let report = session.advance(2.0, &[]);
        assert_eq!(report.state, GameState::Playing);
        assert_eq!(report.ticks_run, 0);

        let report = session.advance(0.0, &[click(&session, 1, 0)]);
        assert_eq!(report.ignitions_applied, 1);
        assert_eq!(report.clicks_dropped, 0);
        assert_eq!(report.state, GameState::Playing);
    }

    #[test]
    fn test_pause_freezes_simulation() {
        let mut session = start(quiet_config(), "FFFFFFFFFF");
        session.advance(0.0, &[click(&session, 0, 0)]);
        session.advance(0.0, &[InputEvent::KeyPress(Key::Pause)]);
        let before = session.fire_state().clone();
        let report = session.advance(5.0, &[click(&session, 9, 0)]);
        assert_eq!(report.state, GameState::Paused);
        assert_eq!(report.ticks_run, 0);
        assert_eq!(report.clicks_dropped, 1);
        assert_eq!(session.fire_state(), &before);

        let report = session.advance(0.0, &[InputEvent::KeyPress(Key::Pause)]);
        assert_eq!(report.state, GameState::Playing);
    }

    #[test]
    fn test_ignition_applies_before_tick() {
        let mut session = start(quiet_config(), "FFFFF");
        let report = session.advance(0.125, &[click(&session, 2, 0)]);
        assert_eq!(report.ignitions_applied, 1);
        assert_eq!(report.ticks_run, 1);
        // the burn was placed before this frame's tick: it already burned
        // through its fuel and lit the cells past the burnt square
        let cells = session.fire_state().cells();
        assert_eq!(cells[2].combustion, CombustionState::Ash);
        assert_eq!(cells[0].combustion, CombustionState::Igniting);
        assert_eq!(cells[4].combustion, CombustionState::Igniting);
        assert_eq!(session.fire_state().tick(), 1);
        assert_eq!(session.burns_used(), 1);
    }

    #[test]
    fn test_rejected_click_is_reported() {
        let mut session = start(quiet_config(), "WFF");
        let report = session.advance(0.0, &[click(&session, 0, 0)]);
        assert_eq!(report.ignitions_rejected, 1);
        assert!(!session.executed_ignitions()[0].succeeded());
        assert_eq!(session.burns_used(), 0);
    }

    #[test]
    fn test_burning_everything_is_a_loss() {
        let mut session = start(quiet_config(), "FFFF\nFFFF\nFFFF");
        session.advance(0.0, &[click(&session, 1, 1)]);
        let mut state = session.state();
        for _ in 0..50 {
            state = session.advance(0.1, &[]).state;
            if matches!(state, GameState::Ended(_)) {
                break;
            }
        }
        assert_eq!(state, GameState::Ended(Outcome::Loss));
    }

    #[test]
    fn test_contained_fire_is_a_win() {
        // a water channel keeps the fire on the left strip
        let config = GameConfig {
            outcome: crate::config::OutcomePolicy {
                min_burnable_fraction: 0.15,
                ..Default::default()
            },
            ..quiet_config()
        };
        let mut session = start(config, "FWFFFFH\nFWFFFFF\nFWFFFFF");
        session.advance(0.0, &[click(&session, 0, 1)]);
        let mut state = session.state();
        for _ in 0..50 {
            state = session.advance(0.1, &[]).state;
            if matches!(state, GameState::Ended(_)) {
                break;
            }
        }
        assert_eq!(state, GameState::Ended(Outcome::Win));
        assert_eq!(session.houses_saved(), 1);
        assert!(session.score() >= 100);
    }

    #[test]
    fn test_restart_resets_fire() {
        let mut session = start(quiet_config(), "FFFF\nFFFF\nFFFF");
        session.advance(0.0, &[click(&session, 1, 1)]);
        for _ in 0..50 {
            if matches!(session.advance(0.1, &[]).state, GameState::Ended(_)) {
                break;
            }
        }
        session.advance(0.0, &[InputEvent::KeyPress(Key::Restart)]);
        assert_eq!(session.state(), GameState::Playing);
        assert_eq!(session.fire_state().tick(), 0);
        assert_eq!(session.stats().ash, 0);
        assert_eq!(session.burns_used(), 0);
    }

    #[test]
    fn test_retro_toggle_is_forwarded() {
        let mut session = start(quiet_config(), "FF");
        let report = session.advance(0.0, &[InputEvent::KeyPress(Key::ToggleRetroEffect)]);
        assert!(report.toggle_retro_effect);
        let report = session.advance(
            0.0,
            &[
                InputEvent::KeyPress(Key::ToggleRetroEffect),
                InputEvent::KeyPress(Key::ToggleRetroEffect),
            ],
        );
        assert!(!report.toggle_retro_effect);
    }

    #[test]
    fn test_audio_signals_follow_fire() {
        let mut session = start(quiet_config(), "FFFFF");
        let report = session.advance(0.0, &[]);
        assert_eq!(report.audio.nearest_burning_distance, None);
        let report = session.advance(0.0, &[click(&session, 2, 0)]);
        assert_eq!(report.audio.burning_cells, 3);
        assert!(report.audio.nearest_burning_distance.is_some());
    }

    #[test]
    fn test_bad_dt_is_ignored() {
        let mut session = start(quiet_config(), "FFFFF");
        session.advance(0.0, &[click(&session, 2, 0)]);
        assert_eq!(session.advance(f32::NAN, &[]).ticks_run, 0);
        assert_eq!(session.advance(-3.0, &[]).ticks_run, 0);
    }
}
