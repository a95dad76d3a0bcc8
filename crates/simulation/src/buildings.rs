use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{BASE_CAPACITY, PLANT_CAPACITY};
use crate::grid::CityGrid;
use crate::records::TileChangeRecord;
use crate::SimulationSet;

/// Per-building service status, derived each tick. Power problems outrank
/// missing road access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingStatus {
    Ok,
    NoPower,
    NoRoadAccess,
}

/// Electricity demand vs. delivery for one building. Written by the power
/// step, read by status derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerModule {
    pub required: f32,
    pub supplied: f32,
}

impl PowerModule {
    pub fn is_fully_powered(&self) -> bool {
        self.supplied >= self.required
    }
}

/// Road reachability flag, recomputed each tick. Roads and power lines set
/// `enabled = false` and report access without searching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadAccessModule {
    pub enabled: bool,
    pub value: bool,
}

/// Generation capacity of a power plant and how much of it consumers have
/// drawn this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantModule {
    pub capacity: f32,
    pub consumed: f32,
}

impl Default for PlantModule {
    fn default() -> Self {
        Self {
            capacity: PLANT_CAPACITY,
            consumed: 0.0,
        }
    }
}

impl PlantModule {
    pub fn available(&self) -> f32 {
        (self.capacity - self.consumed).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DevelopmentState {
    #[default]
    Undeveloped,
    UnderConstruction,
    Developed,
    Abandoned,
}

/// One worker or resident. Owned by its zone's occupants list; eviction
/// drops it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub id: u64,
    pub moved_in: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupantsModule {
    pub occupants: Vec<Occupant>,
}

impl OccupantsModule {
    pub fn count(&self) -> usize {
        self.occupants.len()
    }

    /// Drops every occupant, returning how many were evicted.
    pub fn evict_all(&mut self) -> usize {
        let evicted = self.occupants.len();
        self.occupants.clear();
        evicted
    }
}

/// Development lifecycle plus the occupants it gates. `counter` tracks the
/// current state's dwell: construction progress, distress duration while
/// developed, or the abandonment cooldown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneModule {
    pub state: DevelopmentState,
    pub level: u8,
    pub counter: u32,
    pub occupants: OccupantsModule,
}

impl ZoneModule {
    /// Occupant capacity: `BASE_CAPACITY^level`, zero unless developed.
    pub fn capacity(&self) -> u32 {
        if self.state == DevelopmentState::Developed {
            BASE_CAPACITY.pow(self.level as u32)
        } else {
            0
        }
    }
}

/// Closed set of building kinds, with each kind's modules held by value in
/// the variant payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildingKind {
    Road,
    PowerLine,
    PowerPlant(PlantModule),
    ResidentialZone(ZoneModule),
    CommercialZone(ZoneModule),
    IndustrialZone(ZoneModule),
}

impl BuildingKind {
    /// Parses a kind id from the transport. Unknown tags are the caller's
    /// recoverable "not created" case, not a panic.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "road" => Some(Self::Road),
            "power-line" => Some(Self::PowerLine),
            "power-plant" => Some(Self::PowerPlant(PlantModule::default())),
            "residential" => Some(Self::ResidentialZone(ZoneModule::default())),
            "commercial" => Some(Self::CommercialZone(ZoneModule::default())),
            "industrial" => Some(Self::IndustrialZone(ZoneModule::default())),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Road => "road",
            Self::PowerLine => "power-line",
            Self::PowerPlant(_) => "power-plant",
            Self::ResidentialZone(_) => "residential",
            Self::CommercialZone(_) => "commercial",
            Self::IndustrialZone(_) => "industrial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub x: usize,
    pub y: usize,
    pub status: BuildingStatus,
    pub power: PowerModule,
    pub road_access: RoadAccessModule,
    pub kind: BuildingKind,
}

impl Building {
    pub fn new(x: usize, y: usize, kind: BuildingKind) -> Self {
        let network_piece = matches!(kind, BuildingKind::Road | BuildingKind::PowerLine);
        Self {
            x,
            y,
            status: BuildingStatus::Ok,
            power: PowerModule::default(),
            road_access: RoadAccessModule {
                enabled: !network_piece,
                value: network_piece,
            },
            kind,
        }
    }

    pub fn is_zone(&self) -> bool {
        self.zone().is_some()
    }

    pub fn zone(&self) -> Option<&ZoneModule> {
        match &self.kind {
            BuildingKind::ResidentialZone(z)
            | BuildingKind::CommercialZone(z)
            | BuildingKind::IndustrialZone(z) => Some(z),
            BuildingKind::Road | BuildingKind::PowerLine | BuildingKind::PowerPlant(_) => None,
        }
    }

    pub fn zone_mut(&mut self) -> Option<&mut ZoneModule> {
        match &mut self.kind {
            BuildingKind::ResidentialZone(z)
            | BuildingKind::CommercialZone(z)
            | BuildingKind::IndustrialZone(z) => Some(z),
            BuildingKind::Road | BuildingKind::PowerLine | BuildingKind::PowerPlant(_) => None,
        }
    }

    /// Residents living here (residential zones only).
    pub fn residents(&self) -> Option<&OccupantsModule> {
        match &self.kind {
            BuildingKind::ResidentialZone(z) => Some(&z.occupants),
            _ => None,
        }
    }

    /// Jobs filled here (commercial and industrial zones).
    pub fn jobs(&self) -> Option<&OccupantsModule> {
        match &self.kind {
            BuildingKind::CommercialZone(z) | BuildingKind::IndustrialZone(z) => {
                Some(&z.occupants)
            }
            _ => None,
        }
    }
}

/// Derives each building's status from this tick's power and road access
/// results. Priority: NoPower > NoRoadAccess > Ok.
pub fn derive_status(mut grid: ResMut<CityGrid>, mut changes: EventWriter<TileChangeRecord>) {
    let mut changed: Vec<(usize, usize)> = Vec::new();
    for idx in 0..grid.tiles.len() {
        let tile = &mut grid.tiles[idx];
        let Some(building) = tile.building.as_mut() else {
            continue;
        };
        let next = if !building.power.is_fully_powered() {
            BuildingStatus::NoPower
        } else if !building.road_access.value {
            BuildingStatus::NoRoadAccess
        } else {
            BuildingStatus::Ok
        };
        if next != building.status {
            building.status = next;
            changed.push((tile.x, tile.y));
        }
    }
    for (x, y) in changed {
        changes.send(TileChangeRecord::from_tile(&grid, x, y));
    }
}

pub struct BuildingsPlugin;

impl Plugin for BuildingsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            derive_status
                .after(crate::occupancy::update_occupancy)
                .in_set(SimulationSet::Simulation),
        );
    }
}
