//! Headless integration test harness.
//!
//! Wraps `bevy::app::App` + `SimulationPlugin` in a fluent builder so tests
//! set up city state, advance fixed ticks, and assert on the result without
//! a window or renderer.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::bridge::{CityBridge, SimRequest, SimResponse};
use crate::buildings::{Building, BuildingKind, BuildingStatus, DevelopmentState};
use crate::grid::CityGrid;
use crate::sim_rng::SimRng;
use crate::SimulationPlugin;

pub struct TestCity {
    app: App,
}

impl TestCity {
    /// An empty default-sized city with the standard deterministic seed.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);
        // Clock advances exactly one 100 ms step per update, so every
        // update() pumps exactly one FixedUpdate tick regardless of how fast
        // the test process runs.
        app.insert_resource(TimeUpdateStrategy::ManualDuration(
            std::time::Duration::from_millis(100),
        ));
        // Run one update so Startup systems execute.
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // World setup (builder pattern: consumes and returns Self)
    // -----------------------------------------------------------------------

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.app
            .world_mut()
            .insert_resource(SimRng::from_seed_u64(seed));
        self
    }

    /// Place a building by kind tag directly on the grid.
    pub fn with_building(mut self, x: usize, y: usize, kind_tag: &str) -> Self {
        let kind = BuildingKind::from_tag(kind_tag)
            .unwrap_or_else(|| panic!("unknown building kind '{kind_tag}'"));
        let mut grid = self.app.world_mut().resource_mut::<CityGrid>();
        grid.set_building(x, y, Some(Building::new(x, y, kind)));
        self
    }

    /// Lay a straight road between two points (axis-aligned).
    pub fn with_road(mut self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        let mut grid = self.app.world_mut().resource_mut::<CityGrid>();
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                grid.set_building(x, y, Some(Building::new(x, y, BuildingKind::Road)));
            }
        }
        self
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N fixed-update ticks. The simulation runs at 10 Hz and the clock
    /// steps 100 ms per update, so each update is exactly one tick.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn grid(&self) -> &CityGrid {
        self.app.world().resource::<CityGrid>()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn building(&self, x: usize, y: usize) -> &Building {
        self.grid()
            .get(x, y)
            .building
            .as_ref()
            .unwrap_or_else(|| panic!("no building at ({x}, {y})"))
    }

    pub fn development_state(&self, x: usize, y: usize) -> DevelopmentState {
        self.building(x, y)
            .zone()
            .unwrap_or_else(|| panic!("({x}, {y}) is not a zone"))
            .state
    }

    // -----------------------------------------------------------------------
    // Bridge
    // -----------------------------------------------------------------------

    pub fn submit(&mut self, request: SimRequest) -> bool {
        self.app
            .world_mut()
            .resource_mut::<CityBridge>()
            .submit(request)
    }

    pub fn poll_response(&mut self) -> Option<SimResponse> {
        self.app
            .world_mut()
            .resource_mut::<CityBridge>()
            .poll_response()
    }

    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_status(&self, x: usize, y: usize, expected: BuildingStatus) {
        let actual = self.building(x, y).status;
        assert_eq!(
            actual, expected,
            "expected status {expected:?} at ({x}, {y}), found {actual:?}"
        );
    }

    pub fn assert_road_access(&self, x: usize, y: usize, expected: bool) {
        let actual = self.building(x, y).road_access.value;
        assert_eq!(
            actual, expected,
            "expected road access {expected} at ({x}, {y}), found {actual}"
        );
    }
}

impl Default for TestCity {
    fn default() -> Self {
        Self::new()
    }
}
