use std::collections::VecDeque;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind};
use crate::config::{
    CELL_SIZE, GRID_HEIGHT, GRID_WIDTH, OFFROAD_DRIVE_SPEED, ROAD_DRIVE_SPEED,
};

/// One grid cell. A tile exclusively owns its building: replacing or removing
/// the building drops it (and its modules) with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    pub building: Option<Building>,
}

impl Tile {
    pub fn has_road(&self) -> bool {
        matches!(
            self.building,
            Some(Building {
                kind: BuildingKind::Road,
                ..
            })
        )
    }

    /// Time (seconds) to drive across this tile, or `None` when a building
    /// blocks traffic. Computed from current occupancy, never cached.
    pub fn drive_cost(&self) -> Option<f32> {
        match &self.building {
            Some(b) => match b.kind {
                BuildingKind::Road => Some(CELL_SIZE / ROAD_DRIVE_SPEED),
                _ => None,
            },
            None => Some(CELL_SIZE / OFFROAD_DRIVE_SPEED),
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityGrid {
    pub name: String,
    pub tiles: Vec<Tile>,
    pub width: usize,
    pub height: usize,
}

impl Default for CityGrid {
    fn default() -> Self {
        Self::new("New City", GRID_WIDTH, GRID_HEIGHT)
    }
}

impl CityGrid {
    pub fn new(name: &str, width: usize, height: usize) -> Self {
        Self {
            name: name.to_string(),
            tiles: empty_tiles(width, height),
            width,
            height,
        }
    }

    /// Rebuild the tile array at new dimensions. All existing buildings are
    /// dropped; this is the only way the grid changes size.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.tiles = empty_tiles(width, height);
        self.width = width;
        self.height = height;
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Direct accessor; panics on out-of-bounds coordinates (caller bug).
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &Tile {
        &self.tiles[self.index(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Tile {
        let idx = self.index(x, y);
        &mut self.tiles[idx]
    }

    /// Bounds-checked accessor for callers probing arbitrary coordinates.
    #[inline]
    pub fn try_get(&self, x: usize, y: usize) -> Option<&Tile> {
        if self.in_bounds(x, y) {
            Some(self.get(x, y))
        } else {
            None
        }
    }

    #[inline]
    pub fn try_get_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        if self.in_bounds(x, y) {
            Some(self.get_mut(x, y))
        } else {
            None
        }
    }

    /// The only mutation path for tile occupancy. Dropping the previous
    /// building here also drops its modules and occupants.
    pub fn set_building(&mut self, x: usize, y: usize, building: Option<Building>) {
        self.get_mut(x, y).building = building;
    }

    pub fn world_to_grid(world_x: f32, world_y: f32) -> (i32, i32) {
        let gx = (world_x / CELL_SIZE).floor() as i32;
        let gy = (world_y / CELL_SIZE).floor() as i32;
        (gx, gy)
    }

    pub fn grid_to_world(gx: usize, gy: usize) -> (f32, f32) {
        let wx = gx as f32 * CELL_SIZE + CELL_SIZE * 0.5;
        let wy = gy as f32 * CELL_SIZE + CELL_SIZE * 0.5;
        (wx, wy)
    }

    /// Returns up to 4 cardinal neighbors (west, east, north, south) and the
    /// count of valid entries. Use `&result[..count]` to iterate.
    pub fn neighbors4(&self, x: usize, y: usize) -> ([(usize, usize); 4], usize) {
        let mut result = [(0, 0); 4];
        let mut count = 0;
        if x > 0 {
            result[count] = (x - 1, y);
            count += 1;
        }
        if x + 1 < self.width {
            result[count] = (x + 1, y);
            count += 1;
        }
        if y > 0 {
            result[count] = (x, y - 1);
            count += 1;
        }
        if y + 1 < self.height {
            result[count] = (x, y + 1);
            count += 1;
        }
        (result, count)
    }
}

fn empty_tiles(width: usize, height: usize) -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            tiles.push(Tile {
                x,
                y,
                building: None,
            });
        }
    }
    tiles
}

#[inline]
pub fn manhattan(a: (usize, usize), b: (usize, usize)) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

/// Breadth-first search from `start` out to `max_distance` (Manhattan).
///
/// Expands neighbors in the fixed west/east/north/south order and returns the
/// first tile satisfying `predicate`, or `None` when the frontier empties.
/// Pure query: no grid state is touched.
pub fn bounded_search<P>(
    grid: &CityGrid,
    start: (usize, usize),
    predicate: P,
    max_distance: usize,
) -> Option<&Tile>
where
    P: Fn(&Tile) -> bool,
{
    let start_tile = grid.get(start.0, start.1);
    if predicate(start_tile) {
        return Some(start_tile);
    }

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
            visited[idx] = true;
            let tile = grid.get(nx, ny);
            if predicate(tile) {
                return Some(tile);
            }
            frontier.push_back((nx, ny));
        }
    }
    None
}
