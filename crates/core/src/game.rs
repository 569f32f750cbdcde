//! Per-frame driver tying the session to a render pipeline.

use crate::config::GameConfig;
use crate::error::RenderError;
use crate::grid::TerrainGrid;
use crate::render::{FrameInput, RenderBackend, RenderPipeline, RenderReport};
use crate::simulation::{FrameReport, InputEvent, Session};

/// Simulation and rendering outcome of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    pub sim: FrameReport,
    pub render: RenderReport,
}

/// Session plus renderer, run one frame at a time
#[derive(Debug)]
pub struct GameLoop<B: RenderBackend> {
    session: Session,
    pipeline: RenderPipeline<B>,
}

impl<B: RenderBackend> GameLoop<B> {
    pub fn new(config: GameConfig, terrain: TerrainGrid, backend: B) -> Self {
        let pipeline = RenderPipeline::new(backend, config.retro.clone());
        Self {
            session: Session::new(config, terrain),
            pipeline,
        }
    }

    pub fn from_parts(session: Session, pipeline: RenderPipeline<B>) -> Self {
        Self { session, pipeline }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn pipeline(&self) -> &RenderPipeline<B> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline<B> {
        &mut self.pipeline
    }

    /// Advance the simulation by `dt`, then draw the committed state.
    ///
    /// A retro toggle key pressed this frame applies before drawing.
    ///
    /// # Errors
    /// Backend draw failures. The simulation step has already happened.
    pub fn run_frame(
        &mut self,
        dt: f32,
        events: &[InputEvent],
        surface: &mut B::Surface,
    ) -> Result<FrameOutput, RenderError> {
        let sim = self.session.advance(dt, events);
        if sim.toggle_retro_effect {
            let enabled = self.pipeline.psx_effect_enabled();
            self.pipeline.set_psx_effect_enabled(!enabled);
        }
        let render = self
            .pipeline
            .render(&FrameInput::from_session(&self.session), surface)?;
        Ok(FrameOutput { sim, render })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Framebuffer, SoftwareBackend};
    use crate::simulation::{GameState, Key};

    #[test]
    fn test_run_frame_toggles_retro() {
        let terrain = TerrainGrid::from_ascii("FFG\nGWF").unwrap();
        let mut game = GameLoop::new(GameConfig::default(), terrain, SoftwareBackend::default());
        let mut surface = Framebuffer::new(32, 18);

        let out = game
            .run_frame(0.0, &[InputEvent::KeyPress(Key::StartGame)], &mut surface)
            .unwrap();
        assert_eq!(out.sim.state, GameState::Playing);
        assert!(out.render.retro_active);

        let out = game
            .run_frame(0.0, &[InputEvent::KeyPress(Key::ToggleRetroEffect)], &mut surface)
            .unwrap();
        assert!(!out.render.retro_active);
        assert!(!game.pipeline().psx_effect_enabled());
    }
}
