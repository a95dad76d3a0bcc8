//! Request/response bridge between the simulation and its host.
//!
//! The core owns no transport. A host (render process, test harness, script
//! runner) submits `SimRequest`s into the bridge resource; the simulation
//! drains them once per tick, applies them, and answers each exactly once,
//! correlated by id through a single outstanding-request table. Change
//! records emitted by simulation systems are collected into outbound queues
//! the host drains on its own cadence. Everything crossing the boundary is
//! plain serde data, never shared mutable references.

use std::collections::{HashSet, VecDeque};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind};
use crate::cars::{car_change_record, spawn_car, CarInfo};
use crate::grid::CityGrid;
use crate::pathfinding::find_path;
use crate::records::{CarChangeRecord, CityChangedRecord, TileChangeRecord, WaypointRecord};
use crate::SimulationSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRequest {
    pub id: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
pub enum RequestBody {
    /// Reinitialize the city at the given dimensions, clearing everything.
    NewCity {
        name: String,
        width: usize,
        height: usize,
    },
    /// Construct a building by kind tag.
    PlaceBuilding { x: usize, y: usize, kind: String },
    /// Remove whatever occupies the tile.
    Bulldoze { x: usize, y: usize },
    /// Snapshot one tile's visual state.
    QueryTile { x: usize, y: usize },
    /// Road-preferring route between two tiles.
    FindRoute {
        from_x: usize,
        from_y: usize,
        to_x: usize,
        to_y: usize,
    },
    /// Create a car and start it on its path.
    SpawnCar { info: CarInfo },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimResponse {
    pub id: u64,
    #[serde(flatten)]
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResponseBody {
    CityChanged { record: CityChangedRecord },
    Created { record: TileChangeRecord },
    /// The recoverable "nothing was built" outcome: unknown kind tag,
    /// occupied tile, or out-of-bounds coordinates from the transport.
    NotCreated { reason: String },
    Removed { record: TileChangeRecord },
    Tile { record: TileChangeRecord },
    Route {
        complete: bool,
        path: Vec<WaypointRecord>,
    },
    CarCreated { record: CarChangeRecord },
    Error { message: String },
}

/// The in-process end of the boundary: inbound requests, the outstanding-id
/// table, responses, and per-kind change outboxes.
#[derive(Resource, Default)]
pub struct CityBridge {
    inbound: VecDeque<SimRequest>,
    outstanding: HashSet<u64>,
    responses: VecDeque<SimResponse>,
    tile_changes: VecDeque<TileChangeRecord>,
    car_changes: VecDeque<CarChangeRecord>,
    city_changes: VecDeque<CityChangedRecord>,
}

impl CityBridge {
    /// Queues a request. Returns false (and drops it) when the id is already
    /// in flight; every accepted id is answered exactly once.
    pub fn submit(&mut self, request: SimRequest) -> bool {
        if !self.outstanding.insert(request.id) {
            warn!("bridge: duplicate in-flight request id {}", request.id);
            return false;
        }
        self.inbound.push_back(request);
        true
    }

    pub fn poll_response(&mut self) -> Option<SimResponse> {
        self.responses.pop_front()
    }

    pub fn next_tile_change(&mut self) -> Option<TileChangeRecord> {
        self.tile_changes.pop_front()
    }

    pub fn next_car_change(&mut self) -> Option<CarChangeRecord> {
        self.car_changes.pop_front()
    }

    pub fn next_city_change(&mut self) -> Option<CityChangedRecord> {
        self.city_changes.pop_front()
    }

    pub fn pending_requests(&self) -> usize {
        self.inbound.len()
    }

    fn respond(&mut self, id: u64, body: ResponseBody) {
        self.outstanding.remove(&id);
        self.responses.push_back(SimResponse { id, body });
    }
}

/// Announces the initial city to the host.
pub fn announce_city(grid: Res<CityGrid>, mut changes: EventWriter<CityChangedRecord>) {
    changes.send(CityChangedRecord {
        name: grid.name.clone(),
        width: grid.width,
        height: grid.height,
        clear: Some(true),
    });
}

/// Drains and applies queued requests at the top of the tick.
pub fn process_requests(
    mut commands: Commands,
    time: Res<Time>,
    mut bridge: ResMut<CityBridge>,
    mut grid: ResMut<CityGrid>,
    mut tile_changes: EventWriter<TileChangeRecord>,
    mut car_changes: EventWriter<CarChangeRecord>,
    mut city_changes: EventWriter<CityChangedRecord>,
) {
    while let Some(request) = bridge.inbound.pop_front() {
        let body = match request.body {
            RequestBody::NewCity {
                ref name,
                width,
                height,
            } => {
                grid.name = name.clone();
                grid.resize(width, height);
                let record = CityChangedRecord {
                    name: name.clone(),
                    width,
                    height,
                    clear: Some(true),
                };
                city_changes.send(record.clone());
                ResponseBody::CityChanged { record }
            }
            RequestBody::PlaceBuilding { x, y, ref kind } => {
                place_building(&mut grid, x, y, kind, &mut tile_changes)
            }
            RequestBody::Bulldoze { x, y } => bulldoze(&mut grid, x, y, &mut tile_changes),
            RequestBody::QueryTile { x, y } => {
                if grid.in_bounds(x, y) {
                    ResponseBody::Tile {
                        record: TileChangeRecord::from_tile(&grid, x, y),
                    }
                } else {
                    ResponseBody::Error {
                        message: format!("({x}, {y}) is out of bounds"),
                    }
                }
            }
            RequestBody::FindRoute {
                from_x,
                from_y,
                to_x,
                to_y,
            } => {
                if !grid.in_bounds(from_x, from_y) || !grid.in_bounds(to_x, to_y) {
                    ResponseBody::Error {
                        message: "route endpoints out of bounds".to_string(),
                    }
                } else {
                    let route = find_path(&grid, (from_x, from_y), (to_x, to_y));
                    let complete = route.is_complete();
                    let path = route
                        .points()
                        .iter()
                        .map(|&(x, y)| {
                            let (wx, wy) = CityGrid::grid_to_world(x, y);
                            WaypointRecord {
                                x: wx,
                                y: wy,
                                speed: None,
                            }
                        })
                        .collect();
                    ResponseBody::Route { complete, path }
                }
            }
            RequestBody::SpawnCar { ref info } => {
                spawn_car(&mut commands, info, time.elapsed_secs());
                let record = car_change_record(info);
                car_changes.send(record.clone());
                ResponseBody::CarCreated { record }
            }
        };
        bridge.respond(request.id, body);
    }
}

fn place_building(
    grid: &mut CityGrid,
    x: usize,
    y: usize,
    kind_tag: &str,
    tile_changes: &mut EventWriter<TileChangeRecord>,
) -> ResponseBody {
    if !grid.in_bounds(x, y) {
        return ResponseBody::NotCreated {
            reason: format!("({x}, {y}) is out of bounds"),
        };
    }
    if grid.get(x, y).building.is_some() {
        return ResponseBody::NotCreated {
            reason: format!("({x}, {y}) is occupied"),
        };
    }
    let Some(kind) = BuildingKind::from_tag(kind_tag) else {
        return ResponseBody::NotCreated {
            reason: format!("unknown building kind '{kind_tag}'"),
        };
    };
    let announce_neighbors = matches!(kind, BuildingKind::Road);
    grid.set_building(x, y, Some(Building::new(x, y, kind)));

    let record = TileChangeRecord::from_tile(grid, x, y);
    tile_changes.send(record.clone());
    if announce_neighbors {
        // Adjacent roads change shape when a new piece connects.
        let (neighbors, count) = grid.neighbors4(x, y);
        for &(nx, ny) in &neighbors[..count] {
            if grid.get(nx, ny).has_road() {
                tile_changes.send(TileChangeRecord::from_tile(grid, nx, ny));
            }
        }
    }
    ResponseBody::Created { record }
}

fn bulldoze(
    grid: &mut CityGrid,
    x: usize,
    y: usize,
    tile_changes: &mut EventWriter<TileChangeRecord>,
) -> ResponseBody {
    if !grid.in_bounds(x, y) {
        return ResponseBody::Error {
            message: format!("({x}, {y}) is out of bounds"),
        };
    }
    if grid.get(x, y).building.is_none() {
        return ResponseBody::Error {
            message: format!("nothing to remove at ({x}, {y})"),
        };
    }
    let was_road = grid.get(x, y).has_road();
    // Dropping the building drops its modules and occupants with it.
    grid.set_building(x, y, None);

    let record = TileChangeRecord::from_tile(grid, x, y);
    tile_changes.send(record.clone());
    if was_road {
        let (neighbors, count) = grid.neighbors4(x, y);
        for &(nx, ny) in &neighbors[..count] {
            if grid.get(nx, ny).has_road() {
                tile_changes.send(TileChangeRecord::from_tile(grid, nx, ny));
            }
        }
    }
    ResponseBody::Removed { record }
}

/// Forwards change events into the host-facing outboxes after the
/// simulation pass.
pub fn collect_changes(
    mut bridge: ResMut<CityBridge>,
    mut tiles: EventReader<TileChangeRecord>,
    mut cars: EventReader<CarChangeRecord>,
    mut cities: EventReader<CityChangedRecord>,
) {
    for record in tiles.read() {
        bridge.tile_changes.push_back(record.clone());
    }
    for record in cars.read() {
        bridge.car_changes.push_back(record.clone());
    }
    for record in cities.read() {
        bridge.city_changes.push_back(record.clone());
    }
}

pub struct BridgePlugin;

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CityBridge>()
            .add_event::<TileChangeRecord>()
            .add_event::<CarChangeRecord>()
            .add_event::<CityChangedRecord>()
            .add_systems(Startup, announce_city)
            .add_systems(
                FixedUpdate,
                process_requests.in_set(SimulationSet::PreSim),
            )
            .add_systems(FixedUpdate, collect_changes.in_set(SimulationSet::PostSim));
    }
}
