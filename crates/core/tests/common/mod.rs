#![allow(dead_code)]
//! Shared setup for the integration tests

use ctor::ctor;
use firebreak_core::simulation::{FireAutomaton, TickOutcome};
use firebreak_core::{ClassTable, FireConfig, SpreadCurve, TerrainGrid};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness once per test binary
#[ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Every burning neighbour ignites its neighbours on the next tick
pub fn certain_spread(fuel: f32) -> FireConfig {
    FireConfig {
        spread_curve: SpreadCurve::Constant { probability: 1.0 },
        fuel: ClassTable::uniform(fuel),
        burn_rate: 1.0,
        ignition_delay_ticks: 1,
        ..Default::default()
    }
}

/// Tick until quiescent, returning the number of ticks that advanced
pub fn run_to_quiescence(automaton: &mut FireAutomaton, terrain: &TerrainGrid, limit: u32) -> u32 {
    let mut ticks = 0;
    while ticks < limit {
        match automaton.tick(terrain) {
            TickOutcome::Advanced(_) => ticks += 1,
            TickOutcome::Quiescent => break,
        }
    }
    ticks
}
