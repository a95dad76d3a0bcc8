//! Zone development lifecycle.
//!
//! Undeveloped lots break ground probabilistically once they have road
//! access and power, construction takes a fixed dwell, developed zones grow
//! denser while full and healthy, and sustained service failure tips them
//! into abandonment. Only this step mutates a zone's development state.

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::buildings::{BuildingStatus, DevelopmentState, ZoneModule};
use crate::config::{
    ABANDON_COOLDOWN_TICKS, ABANDON_PROBABILITY, CONSTRUCTION_TICKS, DEVELOP_START_PROBABILITY,
    DISTRESS_TICKS, LEVEL_UP_OCCUPANCY, LEVEL_UP_PROBABILITY, MAX_DEVELOPMENT_LEVEL,
};
use crate::grid::CityGrid;
use crate::records::TileChangeRecord;
use crate::sim_rng::SimRng;
use crate::SimulationSet;

/// Advances one zone by one tick. Returns true when the visible state
/// (state or level) changed.
pub(crate) fn step_zone(
    zone: &mut ZoneModule,
    has_road_access: bool,
    powered: bool,
    healthy: bool,
    rng: &mut ChaCha8Rng,
) -> bool {
    let before = (zone.state, zone.level);
    match zone.state {
        DevelopmentState::Undeveloped => {
            if has_road_access && powered && rng.gen::<f32>() < DEVELOP_START_PROBABILITY {
                zone.state = DevelopmentState::UnderConstruction;
                zone.counter = 0;
            }
        }
        DevelopmentState::UnderConstruction => {
            zone.counter += 1;
            if zone.counter >= CONSTRUCTION_TICKS {
                zone.state = DevelopmentState::Developed;
                zone.level = 1;
                zone.counter = 0;
            }
        }
        DevelopmentState::Developed => {
            if healthy {
                zone.counter = 0;
                let capacity = zone.capacity();
                let filled = zone.occupants.count() as f32;
                if zone.level < MAX_DEVELOPMENT_LEVEL
                    && capacity > 0
                    && filled >= capacity as f32 * LEVEL_UP_OCCUPANCY
                    && rng.gen::<f32>() < LEVEL_UP_PROBABILITY
                {
                    zone.level += 1;
                }
            } else {
                zone.counter += 1;
                if zone.counter >= DISTRESS_TICKS && rng.gen::<f32>() < ABANDON_PROBABILITY {
                    zone.state = DevelopmentState::Abandoned;
                    zone.counter = 0;
                }
            }
        }
        DevelopmentState::Abandoned => {
            zone.counter += 1;
            if zone.counter >= ABANDON_COOLDOWN_TICKS {
                zone.state = DevelopmentState::Undeveloped;
                zone.level = 0;
                zone.counter = 0;
                zone.occupants.evict_all();
            }
        }
    }
    (zone.state, zone.level) != before
}

/// Walks the grid in tile-scan order and steps every zone. Reads the power
/// and road access results of the previous tick's services pass.
pub fn simulate_development(
    mut grid: ResMut<CityGrid>,
    mut rng: ResMut<SimRng>,
    mut changes: EventWriter<TileChangeRecord>,
) {
    let mut changed: Vec<(usize, usize)> = Vec::new();
    for idx in 0..grid.tiles.len() {
        let tile = &mut grid.tiles[idx];
        let Some(building) = tile.building.as_mut() else {
            continue;
        };
        let powered = building.power.is_fully_powered();
        let has_access = building.road_access.value;
        let healthy = building.status == BuildingStatus::Ok;
        let Some(zone) = building.zone_mut() else {
            continue;
        };
        if step_zone(zone, has_access, powered, healthy, &mut rng.0) {
            changed.push((tile.x, tile.y));
        }
    }
    for (x, y) in changed {
        changes.send(TileChangeRecord::from_tile(&grid, x, y));
    }
}

pub struct DevelopmentPlugin;

impl Plugin for DevelopmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            simulate_development.in_set(SimulationSet::Simulation),
        );
    }
}
