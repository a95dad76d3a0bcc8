//! Plain-data change records crossing the simulation/render boundary.
//!
//! The core never talks to a renderer or a transport directly: mutating
//! systems emit these as Bevy events, the bridge queues them, and an external
//! collaborator (de)serializes them. Field names are camelCase on the wire
//! for the browser-side consumer.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::grid::CityGrid;

/// Emitted whenever a tile's visual-relevant state changes: building placed
/// or removed, development tier, service status, road orientation.
#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileChangeRecord {
    pub x: usize,
    pub y: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_orientation: Option<u8>,
}

impl TileChangeRecord {
    /// Snapshot of a tile's current visual state.
    pub fn from_tile(grid: &CityGrid, x: usize, y: usize) -> Self {
        let tile = grid.get(x, y);
        let (building, orientation) = match &tile.building {
            Some(b) => {
                let name = match b.zone() {
                    Some(zone) if zone.level > 0 => format!("{}-{}", b.kind.tag(), zone.level),
                    _ => b.kind.tag().to_string(),
                };
                let orientation = match b.kind {
                    BuildingKind::Road => Some(road_orientation(grid, x, y)),
                    _ => None,
                };
                (Some(name), orientation)
            }
            None => (None, None),
        };
        Self {
            x,
            y,
            floor: None,
            orientation,
            building,
            building_orientation: None,
        }
    }
}

/// Bitmask of adjacent road tiles (west=1, east=2, north=4, south=8) so the
/// renderer can pick straight/corner/tee/cross road meshes.
pub fn road_orientation(grid: &CityGrid, x: usize, y: usize) -> u8 {
    let mut mask = 0u8;
    if x > 0 && grid.get(x - 1, y).has_road() {
        mask |= 1;
    }
    if x + 1 < grid.width && grid.get(x + 1, y).has_road() {
        mask |= 2;
    }
    if y > 0 && grid.get(x, y - 1).has_road() {
        mask |= 4;
    }
    if y + 1 < grid.height && grid.get(x, y + 1).has_road() {
        mask |= 8;
    }
    mask
}

/// One point of a car path on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointRecord {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

/// Emitted on car creation or path/motion update.
#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarChangeRecord {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<WaypointRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<crate::car_path::MotionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f32>,
}

/// Emitted on city (re)initialization or resize.
#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityChangedRecord {
    pub name: String,
    pub width: usize,
    pub height: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear: Option<bool>,
}
