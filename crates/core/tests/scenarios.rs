//! End-to-end scenarios with fixed seeds

mod common;

use common::{certain_spread, run_to_quiescence};
use firebreak_core::simulation::{
    CameraPose, FireAutomaton, IgnitionController, IgnitionKind, TickOutcome,
};
use firebreak_core::{
    CombustionState, GameConfig, GameState, GridCoord, IgnitionConfig, InputEvent, Key, Outcome,
    OutbreakConfig, Session, SimError, TerrainClass, TerrainGrid, Vec3, WorldMapper,
};

#[test]
fn test_five_by_five_forest_burns_out_in_seven_ticks() {
    let terrain = TerrainGrid::filled(5, 5, TerrainClass::Forest).unwrap();
    let run = |seed: u64| {
        let mut automaton = FireAutomaton::new(&terrain, certain_spread(3.0), seed);
        automaton
            .ignite(&terrain, GridCoord::new(2, 2), IgnitionKind::Wildfire)
            .unwrap();
        let mut history = Vec::new();
        loop {
            match automaton.tick(&terrain) {
                TickOutcome::Advanced(_) => history.push(automaton.state().clone()),
                TickOutcome::Quiescent => break,
            }
        }
        history
    };

    let history = run(99);
    // ring by ring: catch, burn three ticks, ash
    assert_eq!(history.len(), 7);
    let last = history.last().unwrap();
    assert_eq!(last.count(CombustionState::Ash), 25);
    assert!(history[..6]
        .iter()
        .all(|state| state.count(CombustionState::Ash) < 25));
    assert_eq!(history[0].get(GridCoord::new(1, 1)).unwrap().combustion, CombustionState::Igniting);
    assert_eq!(history[2].get(GridCoord::new(2, 2)).unwrap().combustion, CombustionState::Ash);

    assert_eq!(run(99), history);
    assert_eq!(run(12345).len(), 7);
}

#[test]
fn test_out_of_bounds_click_changes_nothing() {
    let terrain = TerrainGrid::filled(5, 5, TerrainClass::Grassland).unwrap();
    let mapper = WorldMapper::for_terrain(&terrain, 1.0);
    let mut automaton = FireAutomaton::new(&terrain, certain_spread(3.0), 0);
    let before = automaton.state().clone();
    let mut controller = IgnitionController::new(IgnitionConfig::default());

    let outside = mapper.cell_center(GridCoord::new(5, 2), 0.0);
    let err = controller
        .request_ignition(&mut automaton, &terrain, &mapper, &outside, &CameraPose::default())
        .unwrap_err();
    assert_eq!(
        err,
        SimError::OutOfBounds {
            coord: GridCoord::new(5, 2),
            width: 5,
            height: 5,
        }
    );
    assert_eq!(automaton.state(), &before);
    assert!(automaton.state().get(GridCoord::new(5, 2)).is_err());
}

#[test]
fn test_second_click_on_burning_cell_is_rejected() {
    let terrain = TerrainGrid::filled(5, 5, TerrainClass::Forest).unwrap();
    let mapper = WorldMapper::for_terrain(&terrain, 1.0);
    let mut automaton = FireAutomaton::new(&terrain, certain_spread(3.0), 0);
    let mut controller = IgnitionController::new(IgnitionConfig::default());
    let point = mapper.cell_center(GridCoord::new(2, 2), 0.0);
    let camera = CameraPose::default();

    controller
        .request_ignition(&mut automaton, &terrain, &mapper, &point, &camera)
        .unwrap();
    let err = controller
        .request_ignition(&mut automaton, &terrain, &mapper, &point, &camera)
        .unwrap_err();
    assert_eq!(err.kind(), "already_burning");
    assert_eq!(controller.burns_used(), 1);
}

#[test]
fn test_water_channel_saves_the_village() {
    // controlled burn on the left, the channel keeps it off the houses
    let map = "\
FFFWGGH
FFFWGGG
FFFWGGH";
    let config = GameConfig {
        tick_rate_hz: 8.0,
        outbreak: OutbreakConfig {
            starts: 0,
            ..Default::default()
        },
        fire: certain_spread(2.0),
        ..Default::default()
    };
    let mut session = Session::new(config, TerrainGrid::from_ascii(map).unwrap());
    session.advance(0.0, &[InputEvent::KeyPress(Key::StartGame)]);

    let click = InputEvent::Click {
        world_point: session.mapper().cell_center(GridCoord::new(1, 1), 0.0),
    };
    let report = session.advance(0.0, &[click]);
    assert_eq!(report.ignitions_applied, 1);
    assert_eq!(report.stats.burning, 9);

    let mut state = session.state();
    for _ in 0..100 {
        state = session.advance(0.125, &[]).state;
        if matches!(state, GameState::Ended(_)) {
            break;
        }
    }
    assert_eq!(state, GameState::Ended(Outcome::Win));
    assert_eq!(session.houses_saved(), 2);
    // half the burnable land left: 2 * 100 + 50 * 10
    assert_eq!(session.score(), 700);

    // clicks after the end are dropped
    let report = session.advance(0.0, &[click]);
    assert_eq!(report.clicks_dropped, 1);
}

#[test]
fn test_pause_resume_keeps_partial_tick() {
    let config = GameConfig {
        tick_rate_hz: 4.0,
        outbreak: OutbreakConfig {
            starts: 0,
            ..Default::default()
        },
        fire: certain_spread(5.0),
        ..Default::default()
    };
    let mut session = Session::new(config, TerrainGrid::filled(8, 1, TerrainClass::Forest).unwrap());
    session.advance(0.0, &[InputEvent::KeyPress(Key::StartGame)]);
    let start = InputEvent::Click {
        world_point: session.mapper().cell_center(GridCoord::new(0, 0), 0.0),
    };
    session.advance(0.0, &[start]);

    // half a tick, pause for a long time, then the other half
    assert_eq!(session.advance(0.125, &[]).ticks_run, 0);
    session.advance(0.0, &[InputEvent::KeyPress(Key::Pause)]);
    assert_eq!(session.advance(10.0, &[]).ticks_run, 0);
    session.advance(0.0, &[InputEvent::KeyPress(Key::Pause)]);
    assert_eq!(session.advance(0.125, &[]).ticks_run, 1);
}

#[test]
fn test_world_mapper_round_trip_on_elevated_cells() {
    let terrain = TerrainGrid::new(
        3,
        2,
        vec![TerrainClass::Forest; 6],
        vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5],
    )
    .unwrap();
    let mapper = WorldMapper::for_terrain(&terrain, 2.0);
    for idx in 0..terrain.len() {
        let coord = terrain.coord_of(idx);
        let center = mapper.cell_center(coord, terrain.elevation_at_index(idx));
        approx::assert_relative_eq!(center.y, terrain.elevation_at_index(idx));
        assert_eq!(mapper.world_to_grid(&center), coord);
    }
    assert!(!terrain.contains(mapper.world_to_grid(&Vec3::new(100.0, 0.0, 0.0))));
    let mut automaton = FireAutomaton::new(&terrain, certain_spread(1.0), 0);
    assert_eq!(run_to_quiescence(&mut automaton, &terrain, 10), 0);
}
