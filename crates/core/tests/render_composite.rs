//! Full frames through the software backend

mod common;

use common::certain_spread;
use firebreak_core::render::RenderBackend;
use firebreak_core::{
    project, Framebuffer, GameConfig, GameLoop, GridCoord, InputEvent, Key, OutbreakConfig,
    RetroConfig, Rgba, SoftwareBackend, TerrainGrid,
};

const MAP: &str = "\
WWWWWWWW
WFFGGFFW
WFHGG.FW
WFF.GFFW
WWWWWWWW";

fn config(retro: bool) -> GameConfig {
    GameConfig {
        tick_rate_hz: 10.0,
        outbreak: OutbreakConfig {
            starts: 0,
            ..Default::default()
        },
        fire: certain_spread(4.0),
        retro: RetroConfig {
            enabled: retro,
            low_res_width: 32,
            low_res_height: 32,
        },
        ..Default::default()
    }
}

fn start(game: &mut GameLoop<SoftwareBackend>, surface: &mut Framebuffer) {
    game.run_frame(0.0, &[InputEvent::KeyPress(Key::StartGame)], surface)
        .unwrap();
    let click = InputEvent::Click {
        world_point: game.session().mapper().cell_center(GridCoord::new(1, 1), 0.0),
    };
    game.run_frame(0.0, &[click], surface).unwrap();
}

fn assert_blocky(frame: &Framebuffer, block: u32) {
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let anchor = frame.pixel(x - x % block, y - y % block);
            assert_eq!(frame.pixel(x, y), anchor, "pixel ({x}, {y}) breaks its block");
        }
    }
}

#[test]
fn test_retro_frame_is_two_by_two_blocks() {
    let terrain = TerrainGrid::from_ascii(MAP).unwrap();
    let mut game = GameLoop::new(config(true), terrain, SoftwareBackend::default());
    let mut surface = Framebuffer::new(64, 64);
    start(&mut game, &mut surface);

    let out = game.run_frame(0.1, &[], &mut surface).unwrap();
    assert!(out.render.retro_active);
    assert_eq!(out.render.render_size, (32, 32));
    assert_eq!(out.render.surface_size, (64, 64));
    assert_eq!(game.pipeline().backend().offscreen_size(), Some((32, 32)));
    assert_blocky(&surface, 2);

    // not just sky
    let distinct: std::collections::HashSet<Rgba> = surface.pixels().iter().copied().collect();
    assert!(distinct.len() > 1);
}

#[test]
fn test_toggling_retro_never_touches_the_fire() {
    let terrain = TerrainGrid::from_ascii(MAP).unwrap();
    let mut toggled = GameLoop::new(config(true), terrain.clone(), SoftwareBackend::default());
    let mut control = GameLoop::new(config(true), terrain, SoftwareBackend::default());
    let mut toggled_surface = Framebuffer::new(64, 64);
    let mut control_surface = Framebuffer::new(64, 64);
    start(&mut toggled, &mut toggled_surface);
    start(&mut control, &mut control_surface);

    for frame in 0..30 {
        let events = if frame % 3 == 0 {
            vec![InputEvent::KeyPress(Key::ToggleRetroEffect)]
        } else {
            Vec::new()
        };
        let a = toggled.run_frame(0.05, &events, &mut toggled_surface).unwrap();
        let b = control.run_frame(0.05, &[], &mut control_surface).unwrap();
        assert_eq!(a.sim.stats, b.sim.stats);
        assert_eq!(a.render.billboards, b.render.billboards);
        assert!(b.render.retro_active);
    }
    assert_eq!(toggled.session().fire_state(), control.session().fire_state());

    let billboards = |game: &GameLoop<SoftwareBackend>| {
        let session = game.session();
        project(
            session.fire_state(),
            session.terrain(),
            &session.camera(),
            session.mapper(),
            &session.config().sprites,
        )
        .collect::<Vec<_>>()
    };
    assert_eq!(billboards(&toggled), billboards(&control));
}

#[test]
fn test_effect_off_renders_native_and_frees_target() {
    let terrain = TerrainGrid::from_ascii(MAP).unwrap();
    let mut game = GameLoop::new(config(true), terrain, SoftwareBackend::default());
    let mut surface = Framebuffer::new(64, 64);
    start(&mut game, &mut surface);
    assert!(game.pipeline().backend().offscreen_size().is_some());

    let out = game
        .run_frame(0.0, &[InputEvent::KeyPress(Key::ToggleRetroEffect)], &mut surface)
        .unwrap();
    assert!(!out.render.retro_active);
    assert_eq!(out.render.render_size, (64, 64));
    assert_eq!(game.pipeline().backend().offscreen_size(), None);
}

#[test]
fn test_allocation_failure_falls_back_once() {
    let terrain = TerrainGrid::from_ascii(MAP).unwrap();
    let mut game = GameLoop::new(
        config(true),
        terrain,
        SoftwareBackend::with_pixel_budget(10),
    );
    let mut surface = Framebuffer::new(64, 64);

    let out = game
        .run_frame(0.0, &[InputEvent::KeyPress(Key::StartGame)], &mut surface)
        .unwrap();
    assert!(out.render.fell_back);
    assert!(!out.render.retro_active);
    assert_eq!(out.render.render_size, (64, 64));
    assert!(game.pipeline().fallback_latched());
    assert_eq!(game.pipeline().backend().offscreen_size(), None);

    // the effect stays off, even when asked for again
    game.pipeline_mut().set_psx_effect_enabled(true);
    let out = game.run_frame(0.1, &[], &mut surface).unwrap();
    assert!(!out.render.fell_back);
    assert!(!out.render.retro_active);
}

#[test]
fn test_native_and_retro_match_on_solid_regions() {
    // a one-class map fills the centre of the view with one colour either way
    let terrain = TerrainGrid::filled(40, 40, firebreak_core::TerrainClass::Water).unwrap();
    let mut native = GameLoop::new(config(false), terrain.clone(), SoftwareBackend::default());
    let mut retro = GameLoop::new(config(true), terrain, SoftwareBackend::default());
    let mut native_surface = Framebuffer::new(64, 64);
    let mut retro_surface = Framebuffer::new(64, 64);
    native.run_frame(0.0, &[], &mut native_surface).unwrap();
    retro.run_frame(0.0, &[], &mut retro_surface).unwrap();

    assert_eq!(native_surface.pixel(32, 32), retro_surface.pixel(32, 32));
    assert_ne!(native_surface.pixel(32, 32), None);
}
