//! Power distribution.
//!
//! Each tick: demand is reset from zone state, then consumers draw from
//! plants reachable through the conductor network (power lines and plants)
//! within a bounded radius, in deterministic tile-scan order. A consumer
//! hooks in through any conductor adjacent to it; what it actually receives
//! is written to its `PowerModule` and drives the NoPower status.

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::buildings::{Building, BuildingKind, DevelopmentState};
use crate::config::{POWER_SEARCH_RADIUS, ZONE_POWER_DEMAND};
use crate::grid::{manhattan, CityGrid, Tile};
use crate::SimulationSet;

fn conducts(tile: &Tile) -> bool {
    matches!(
        tile.building,
        Some(Building {
            kind: BuildingKind::PowerLine | BuildingKind::PowerPlant(_),
            ..
        })
    )
}

fn is_plant(tile: &Tile) -> bool {
    matches!(
        tile.building,
        Some(Building {
            kind: BuildingKind::PowerPlant(_),
            ..
        })
    )
}

/// Plants reachable from `start` through conducting tiles, in breadth-first
/// discovery order (nearest first). The start tile itself does not need to
/// conduct; it hooks in through adjacent conductors.
fn reachable_plants(
    grid: &CityGrid,
    start: (usize, usize),
    max_distance: usize,
) -> Vec<(usize, usize)> {
    let mut plants = Vec::new();
    let mut visited = vec![false; grid.width * grid.height];
    visited[grid.index(start.0, start.1)] = true;

    let mut frontier: VecDeque<(usize, usize)> = VecDeque::new();
    frontier.push_back(start);

    while let Some((x, y)) = frontier.pop_front() {
        let (neighbors, count) = grid.neighbors4(x, y);
        for &(nx, ny) in &neighbors[..count] {
            let idx = grid.index(nx, ny);
            if visited[idx] {
                continue;
            }
            if manhattan(start, (nx, ny)) > max_distance {
                continue;
            }
            let tile = grid.get(nx, ny);
            if !conducts(tile) {
                continue;
            }
            visited[idx] = true;
            if is_plant(tile) {
                plants.push((nx, ny));
            }
            frontier.push_back((nx, ny));
        }
    }
    plants
}

/// Runs the full distribution pass for one tick.
pub fn run_distribution(grid: &mut CityGrid) {
    // Phase 1: reset plant dispatch and set demand from zone state. A lot
    // under construction or awaiting development still needs a hookup's
    // worth of power; abandoned lots draw nothing.
    for tile in grid.tiles.iter_mut() {
        let Some(building) = tile.building.as_mut() else {
            continue;
        };
        building.power.supplied = 0.0;
        building.power.required = match &mut building.kind {
            BuildingKind::PowerPlant(plant) => {
                plant.consumed = 0.0;
                0.0
            }
            BuildingKind::Road | BuildingKind::PowerLine => 0.0,
            BuildingKind::ResidentialZone(zone)
            | BuildingKind::CommercialZone(zone)
            | BuildingKind::IndustrialZone(zone) => match zone.state {
                DevelopmentState::Abandoned => 0.0,
                DevelopmentState::Developed => ZONE_POWER_DEMAND * zone.level as f32,
                _ => ZONE_POWER_DEMAND,
            },
        };
    }

    // Phase 2: consumers draw in scan order, nearest plants first.
    for idx in 0..grid.tiles.len() {
        let (x, y, required) = {
            let tile = &grid.tiles[idx];
            match &tile.building {
                Some(b) if b.power.required > 0.0 => (tile.x, tile.y, b.power.required),
                _ => continue,
            }
        };

        let plants = reachable_plants(grid, (x, y), POWER_SEARCH_RADIUS);
        let mut remaining = required;
        for (px, py) in plants {
            if remaining <= 0.0 {
                break;
            }
            if let Some(Building {
                kind: BuildingKind::PowerPlant(plant),
                ..
            }) = grid.get_mut(px, py).building.as_mut()
            {
                let draw = plant.available().min(remaining);
                plant.consumed += draw;
                remaining -= draw;
            }
        }

        if let Some(building) = grid.tiles[idx].building.as_mut() {
            building.power.supplied = required - remaining;
        }
    }
}

pub fn distribute_power(mut grid: ResMut<CityGrid>) {
    run_distribution(&mut grid);
}

pub struct PowerPlugin;

impl Plugin for PowerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            distribute_power
                .after(crate::development::simulate_development)
                .in_set(SimulationSet::Simulation),
        );
    }
}
