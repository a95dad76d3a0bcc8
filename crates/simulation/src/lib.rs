use bevy::prelude::*;

pub mod bridge;
pub mod buildings;
pub mod car_path;
pub mod cars;
pub mod config;
pub mod development;
pub mod grid;
pub mod heap;
pub mod occupancy;
pub mod pathfinding;
pub mod power;
pub mod records;
pub mod road_access;
pub mod sim_rng;
pub mod stats;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub mod test_harness;

/// Global tick counter incremented each FixedUpdate, used for timestamps
/// (occupant move-in ticks) and deterministic bookkeeping.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

pub fn advance_tick(mut tick: ResMut<TickCounter>) {
    tick.0 = tick.0.wrapping_add(1);
}

/// Ordered phases for systems running in the `FixedUpdate` schedule.
///
/// Configured as a chain: `PreSim` → `Simulation` → `PostSim`.
/// * **PreSim** – tick counter, host request processing.
/// * **Simulation** – the building pass in deterministic tile-scan order:
///   development → power → road access → occupancy → status, chained via
///   explicit `.after()` constraints within this set.
/// * **PostSim** – read-only aggregation (stats) and change-record
///   collection for the host.
///
/// Vehicle motion runs in `Update` on the frame cadence; it only reads
/// per-car state and the clock, never grid state, so the two schedules need
/// no coordination beyond Bevy's usual exclusivity.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    PreSim,
    Simulation,
    PostSim,
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::PreSim,
                SimulationSet::Simulation,
                SimulationSet::PostSim,
            )
                .chain(),
        );

        app.insert_resource(Time::<Fixed>::from_hz(config::TICK_RATE_HZ))
            .init_resource::<TickCounter>()
            .init_resource::<sim_rng::SimRng>()
            .init_resource::<grid::CityGrid>()
            .add_systems(FixedUpdate, advance_tick.in_set(SimulationSet::PreSim));

        app.add_plugins((
            development::DevelopmentPlugin,
            power::PowerPlugin,
            road_access::RoadAccessPlugin,
            occupancy::OccupancyPlugin,
            buildings::BuildingsPlugin,
            stats::StatsPlugin,
            cars::CarsPlugin,
            bridge::BridgePlugin,
        ));
    }
}
