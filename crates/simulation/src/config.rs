pub const GRID_WIDTH: usize = 16;
pub const GRID_HEIGHT: usize = 16;
pub const CELL_SIZE: f32 = 1.0;

/// Fixed simulation tick rate (Hz). One tick advances every building once.
pub const TICK_RATE_HZ: f64 = 10.0;

/// Search radius (Manhattan, in cells) for the road access query.
pub const ROAD_ACCESS_RADIUS: usize = 3;
/// Search radius (Manhattan, in cells) for power distribution.
pub const POWER_SEARCH_RADIUS: usize = 6;
/// Hard cap on the pathfinder's open set. Hitting it degrades the search to
/// the closest-approach fallback rather than failing.
pub const MAX_OPEN_SET: usize = 1000;

// Drive speeds in cells per second; edge cost = CELL_SIZE / speed, so path
// costs and the travel-time heuristic share the same unit (seconds).
pub const ROAD_DRIVE_SPEED: f32 = 4.0;
pub const OFFROAD_DRIVE_SPEED: f32 = 1.0;

// Zone development
pub const DEVELOP_START_PROBABILITY: f32 = 0.02;
pub const CONSTRUCTION_TICKS: u32 = 100;
pub const LEVEL_UP_PROBABILITY: f32 = 0.01;
/// Occupancy fraction at which a developed zone becomes eligible to level up.
pub const LEVEL_UP_OCCUPANCY: f32 = 0.75;
pub const ABANDON_PROBABILITY: f32 = 0.02;
/// Consecutive unhealthy ticks before abandonment rolls begin.
pub const DISTRESS_TICKS: u32 = 30;
pub const ABANDON_COOLDOWN_TICKS: u32 = 500;
pub const MAX_DEVELOPMENT_LEVEL: u8 = 3;

// Occupancy: capacity = BASE_CAPACITY^level once developed.
pub const BASE_CAPACITY: u32 = 4;
pub const MOVE_IN_PROBABILITY: f32 = 0.1;

// Power
pub const PLANT_CAPACITY: f32 = 100.0;
/// Demand per zone: one unit of this while hooked up, one per level once built.
pub const ZONE_POWER_DEMAND: f32 = 10.0;

// Vehicle motion (cells per second; radii and offsets in cells)
pub const CAR_STRAIGHT_SPEED: f32 = 4.0;
pub const CAR_TURN_SPEED: f32 = 2.0;
pub const CAR_UTURN_SPEED: f32 = 1.0;
pub const MAX_TURN_RADIUS: f32 = 0.5;
pub const UTURN_RADIUS: f32 = 0.2;
/// Lateral offset to the right of travel so opposing directions on the same
/// polyline don't coincide.
pub const LANE_OFFSET: f32 = 0.08;
/// Corners flatter than this (radians, ~1 degree) pass through unchanged.
pub const COLLINEAR_EPSILON: f32 = 0.0175;
/// Corners sharper than this (radians, 120 degrees) become a 3-arc U-turn.
pub const UTURN_THRESHOLD: f32 = 2.094_395;
