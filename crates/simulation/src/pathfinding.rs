//! Best-first search over the tile grid.
//!
//! A* when a heuristic is supplied, plain uniform-cost search otherwise. The
//! open set is hard-capped; when the cap is hit or the frontier empties
//! before the goal, the search degrades to a closest-approach fallback: the
//! remaining open entry with the lowest heuristic estimate becomes the end
//! of a partial route. Callers that prefer a best-effort route over no route
//! (vehicle dispatch) consume `Route::Partial`; everyone else matches on the
//! variant and cannot mistake a fallback for a full path.

use std::collections::{HashMap, HashSet};

use crate::config::{CELL_SIZE, MAX_OPEN_SET, ROAD_DRIVE_SPEED};
use crate::grid::{manhattan, CityGrid, Tile};
use crate::heap::MinHeap;

/// Search-scoped node record. Lives in one search call's arena, never longer.
struct PathNode {
    x: usize,
    y: usize,
    g: f32,
    h: f32,
    parent: Option<usize>,
}

/// A search result. `Complete` reached the goal; `Partial` is the
/// closest-approach fallback and its last point is not the goal.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Complete(Vec<(usize, usize)>),
    Partial(Vec<(usize, usize)>),
}

impl Route {
    pub fn is_complete(&self) -> bool {
        matches!(self, Route::Complete(_))
    }

    pub fn points(&self) -> &[(usize, usize)] {
        match self {
            Route::Complete(points) | Route::Partial(points) => points,
        }
    }

    pub fn into_points(self) -> Vec<(usize, usize)> {
        match self {
            Route::Complete(points) | Route::Partial(points) => points,
        }
    }
}

/// Manhattan distance converted to seconds at the maximum achievable road
/// speed, so the estimate shares units with accumulated edge costs and never
/// overestimates.
pub fn travel_time_heuristic(from: (usize, usize), to: (usize, usize)) -> f32 {
    manhattan(from, to) as f32 * CELL_SIZE / ROAD_DRIVE_SPEED
}

/// Route from `start` to `goal`, preferring roads.
pub fn find_path(grid: &CityGrid, start: (usize, usize), goal: (usize, usize)) -> Route {
    search(
        grid,
        start,
        |tile| (tile.x, tile.y) == goal,
        |tile| travel_time_heuristic((tile.x, tile.y), goal),
        true,
    )
}

/// Cheapest route to the closest tile matching `is_found`, irrespective of
/// direction (uniform-cost search). `None` when nothing matches.
pub fn find_nearest<P>(grid: &CityGrid, start: (usize, usize), is_found: P) -> Option<Vec<(usize, usize)>>
where
    P: Fn(&Tile) -> bool,
{
    match search(grid, start, is_found, |_| 0.0, false) {
        Route::Complete(points) => Some(points),
        Route::Partial(_) => None,
    }
}

/// Best-first search. Panics if `start` is out of bounds (caller bug); an
/// unreachable goal is an ordinary `Route::Partial`, never an error.
///
/// Closed nodes are never re-opened. Edge costs derive from occupancy and
/// are fixed for the duration of one search, so the skipped re-expansion
/// cannot produce a cheaper path here.
pub fn search<G, H>(
    grid: &CityGrid,
    start: (usize, usize),
    is_goal: G,
    heuristic: H,
    use_heuristic: bool,
) -> Route
where
    G: Fn(&Tile) -> bool,
    H: Fn(&Tile) -> f32,
{
    let mut nodes: Vec<PathNode> = Vec::new();
    let mut best_g: HashMap<(usize, usize), f32> = HashMap::new();
    let mut closed: HashSet<(usize, usize)> = HashSet::new();
    // Open entries are (node index, priority); the scoring function reads
    // the priority computed at push time.
    let mut open: MinHeap<(usize, f32), _> = MinHeap::new(|entry: &(usize, f32)| entry.1);

    let start_tile = grid.get(start.0, start.1);
    let h0 = heuristic(start_tile);
    nodes.push(PathNode {
        x: start.0,
        y: start.1,
        g: 0.0,
        h: h0,
        parent: None,
    });
    best_g.insert(start, 0.0);
    open.push((0, if use_heuristic { h0 } else { 0.0 }));

    // Best heuristic seen anywhere, for the degenerate case where the open
    // set drains completely (isolated start tile).
    let mut best_seen = 0usize;

    'search: while let Some((idx, _)) = open.pop() {
        let (x, y) = (nodes[idx].x, nodes[idx].y);
        if closed.contains(&(x, y)) {
            continue; // stale duplicate entry
        }
        let tile = grid.get(x, y);
        if is_goal(tile) {
            return Route::Complete(reconstruct(&nodes, idx));
        }
        closed.insert((x, y));

        let (neighbors, count) = grid.neighbors4(x, y);
        for &(nx, ny) in &neighbors[..count] {
            if closed.contains(&(nx, ny)) {
                continue;
            }
            let neighbor = grid.get(nx, ny);
            let Some(edge) = neighbor.drive_cost() else {
                continue;
            };
            let g = nodes[idx].g + edge;
            if let Some(&prev) = best_g.get(&(nx, ny)) {
                if g >= prev {
                    continue;
                }
            }
            if open.len() >= MAX_OPEN_SET {
                break 'search;
            }
            best_g.insert((nx, ny), g);
            let h = heuristic(neighbor);
            nodes.push(PathNode {
                x: nx,
                y: ny,
                g,
                h,
                parent: Some(idx),
            });
            let node_idx = nodes.len() - 1;
            if h < nodes[best_seen].h {
                best_seen = node_idx;
            }
            open.push((node_idx, if use_heuristic { g + h } else { g }));
        }
    }

    // Goal not reached: closest approach by heuristic from whatever the open
    // set still holds, or the best node seen when it drained.
    let fallback = open
        .iter()
        .filter(|(idx, _)| !closed.contains(&(nodes[*idx].x, nodes[*idx].y)))
        .min_by(|a, b| {
            nodes[a.0]
                .h
                .partial_cmp(&nodes[b.0].h)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(idx, _)| *idx)
        .unwrap_or(best_seen);
    Route::Partial(reconstruct(&nodes, fallback))
}

fn reconstruct(nodes: &[PathNode], end: usize) -> Vec<(usize, usize)> {
    let mut points = Vec::new();
    let mut cursor = Some(end);
    while let Some(idx) = cursor {
        points.push((nodes[idx].x, nodes[idx].y));
        cursor = nodes[idx].parent;
    }
    points.reverse();
    points
}
