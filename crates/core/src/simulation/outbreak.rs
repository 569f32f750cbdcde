//! Wildfire starts placed on the map border at the beginning of a session.

use crate::config::OutbreakConfig;
use crate::core_types::{CombustionState, GridCoord};
use crate::grid::TerrainGrid;
use crate::simulation::automaton::{FireAutomaton, IgnitionKind};
use rand::Rng;
use tracing::{info, warn};

/// Cells lit by [`seed_outbreak`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutbreakReport {
    /// One entry per successful start
    pub starts: Vec<GridCoord>,
    /// Every lit cell, starts included
    pub cells: Vec<GridCoord>,
}

fn random_edge_cell<R: Rng>(rng: &mut R, width: i32, height: i32) -> GridCoord {
    match rng.random_range(0..4) {
        0 => GridCoord::new(rng.random_range(0..width), 0),
        1 => GridCoord::new(width - 1, rng.random_range(0..height)),
        2 => GridCoord::new(rng.random_range(0..width), height - 1),
        _ => GridCoord::new(0, rng.random_range(0..height)),
    }
}

fn is_unburnt(automaton: &FireAutomaton, coord: GridCoord) -> bool {
    automaton
        .state_at(coord)
        .is_ok_and(|cell| cell.combustion == CombustionState::Unburnt)
}

/// Light `config.starts` wildfires on random flammable border cells.
///
/// Each start also lights a few random flammable cells next to it. A start
/// that finds no usable cell within `config.attempts` tries is skipped with a
/// warning.
pub fn seed_outbreak<R: Rng>(
    automaton: &mut FireAutomaton,
    terrain: &TerrainGrid,
    config: &OutbreakConfig,
    rng: &mut R,
) -> OutbreakReport {
    let width = terrain.width() as i32;
    let height = terrain.height() as i32;
    let mut report = OutbreakReport::default();

    for start in 0..config.starts {
        let mut placed = false;
        for _ in 0..config.attempts {
            let coord = random_edge_cell(rng, width, height);
            let flammable = terrain.class_at(coord).is_ok_and(|c| c.is_flammable());
            if !flammable || !is_unburnt(automaton, coord) {
                continue;
            }
            if automaton.ignite(terrain, coord, IgnitionKind::Wildfire).is_err() {
                continue;
            }
            report.starts.push(coord);
            report.cells.push(coord);

            let extra_max = config.extra_cells_max.max(config.extra_cells_min);
            for _ in 0..rng.random_range(config.extra_cells_min..=extra_max) {
                let neighbor = GridCoord::new(
                    (coord.x + rng.random_range(-1..=1)).clamp(0, width - 1),
                    (coord.z + rng.random_range(-1..=1)).clamp(0, height - 1),
                );
                let flammable = terrain.class_at(neighbor).is_ok_and(|c| c.is_flammable());
                if flammable
                    && is_unburnt(automaton, neighbor)
                    && automaton
                        .ignite(terrain, neighbor, IgnitionKind::Wildfire)
                        .is_ok()
                {
                    report.cells.push(neighbor);
                }
            }
            placed = true;
            break;
        }
        if !placed {
            warn!(start, attempts = config.attempts, "No flammable border cell found for fire start");
        }
    }

    info!(
        starts = report.starts.len(),
        cells = report.cells.len(),
        "Wildfire outbreak seeded"
    );
    report
}
