//! Read-only city aggregates, recomputed after the simulation pass so HUD
//! and external callers get a consistent per-tick snapshot.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingStatus, DevelopmentState};
use crate::grid::CityGrid;
use crate::SimulationSet;

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityStats {
    pub population: u32,
    pub jobs: u32,
    pub buildings: u32,
    pub developed_zones: u32,
    pub abandoned_zones: u32,
    pub unpowered_buildings: u32,
}

pub fn update_stats(grid: Res<CityGrid>, mut stats: ResMut<CityStats>) {
    let mut next = CityStats::default();
    for tile in &grid.tiles {
        let Some(building) = &tile.building else {
            continue;
        };
        next.buildings += 1;
        if building.status == BuildingStatus::NoPower {
            next.unpowered_buildings += 1;
        }
        if let Some(residents) = building.residents() {
            next.population += residents.count() as u32;
        }
        if let Some(jobs) = building.jobs() {
            next.jobs += jobs.count() as u32;
        }
        if let Some(zone) = building.zone() {
            match zone.state {
                DevelopmentState::Developed => next.developed_zones += 1,
                DevelopmentState::Abandoned => next.abandoned_zones += 1,
                _ => {}
            }
        }
    }
    *stats = next;
}

pub struct StatsPlugin;

impl Plugin for StatsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CityStats>()
            .add_systems(FixedUpdate, update_stats.in_set(SimulationSet::PostSim));
    }
}
