//! Road access recomputation.
//!
//! Every building with `road_access.enabled` re-runs the bounded
//! breadth-first search each tick, so bulldozed roads are noticed the tick
//! after they disappear. Roads and power lines are exempt and keep the
//! access value they were constructed with.

use bevy::prelude::*;

use crate::config::ROAD_ACCESS_RADIUS;
use crate::grid::{bounded_search, CityGrid, Tile};
use crate::SimulationSet;

/// Recomputes `road_access.value` for the whole grid.
pub fn run_road_access(grid: &mut CityGrid) {
    let mut results: Vec<(usize, bool)> = Vec::new();
    for idx in 0..grid.tiles.len() {
        let tile = &grid.tiles[idx];
        let Some(building) = &tile.building else {
            continue;
        };
        if !building.road_access.enabled {
            continue;
        }
        let reachable =
            bounded_search(grid, (tile.x, tile.y), Tile::has_road, ROAD_ACCESS_RADIUS).is_some();
        results.push((idx, reachable));
    }
    for (idx, reachable) in results {
        if let Some(building) = grid.tiles[idx].building.as_mut() {
            building.road_access.value = reachable;
        }
    }
}

pub fn update_road_access(mut grid: ResMut<CityGrid>) {
    run_road_access(&mut grid);
}

pub struct RoadAccessPlugin;

impl Plugin for RoadAccessPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            update_road_access
                .after(crate::power::distribute_power)
                .in_set(SimulationSet::Simulation),
        );
    }
}
