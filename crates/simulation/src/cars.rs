//! Per-car motion state machine.
//!
//! Cars are entities holding a compiled segment path and a state machine
//! advanced once per rendered frame from the clock. Each call is a pure
//! function of (state, now): progress within the current segment is clamped
//! to [0, 1], and a segment only hands off when its progress reaches 1. The
//! next segment's start time is the previous start plus the previous
//! duration, not "now", so long frames never accumulate drift.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::car_path::{compile_path, CarPose, CarSegment, MotionMode, Waypoint};
use crate::records::{CarChangeRecord, WaypointRecord};

/// Plain-data description of a car: identity, an opaque model handle for the
/// renderer, its waypoints, and how it moves along them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarInfo {
    pub id: u32,
    pub model: String,
    pub waypoints: Vec<Waypoint>,
    pub motion: MotionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f32>,
}

#[derive(Component, Debug)]
pub struct Car {
    pub id: u32,
}

/// Compiled path plus the raw waypoints it came from (kept so the
/// forward-backward mode can recompile the reversed polyline).
#[derive(Component, Debug)]
pub struct CarPath {
    pub segments: Vec<CarSegment>,
    pub mode: MotionMode,
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CarState {
    /// Terminal until a new path is assigned; infinite duration.
    Idle,
    FollowingPath { segment: usize, started_at: f32 },
}

#[derive(Component, Debug)]
pub struct CarMotion {
    pub state: CarState,
    pub pose: CarPose,
}

/// Entry speed expected by whatever follows `index`: the next segment, the
/// wrapped-around first segment when looping, or the segment's own cruise
/// speed when idle comes next (no braking target).
fn next_entry_speed(segments: &[CarSegment], index: usize, mode: MotionMode) -> f32 {
    if index + 1 < segments.len() {
        segments[index + 1].max_entry_speed()
    } else if mode == MotionMode::Loop {
        segments[0].max_entry_speed()
    } else {
        segments[index].max_entry_speed()
    }
}

/// Builds path components for a car. Paths with fewer than two waypoints
/// compile to no segments and the car collapses straight to idle.
pub fn build_path(info: &CarInfo, now: f32) -> (CarPath, CarMotion) {
    let mut segments = compile_path(&info.waypoints, info.motion);
    let started_at = info.start_time.unwrap_or(now);

    let (state, pose) = if segments.is_empty() {
        let position = info
            .waypoints
            .first()
            .map(Waypoint::position)
            .unwrap_or(Vec2::ZERO);
        (
            CarState::Idle,
            CarPose {
                position,
                heading: 0.0,
                speed: 0.0,
            },
        )
    } else {
        let v_next = next_entry_speed(&segments, 0, info.motion);
        segments[0].initialize(0.0, v_next);
        (
            CarState::FollowingPath {
                segment: 0,
                started_at,
            },
            segments[0].pose(0.0),
        )
    };

    (
        CarPath {
            segments,
            mode: info.motion,
            waypoints: info.waypoints.clone(),
        },
        CarMotion { state, pose },
    )
}

pub fn spawn_car(commands: &mut Commands, info: &CarInfo, now: f32) -> Entity {
    let (path, motion) = build_path(info, now);
    commands.spawn((Car { id: info.id }, path, motion)).id()
}

/// The change record announcing a car to the renderer.
pub fn car_change_record(info: &CarInfo) -> CarChangeRecord {
    CarChangeRecord {
        id: info.id,
        model: Some(info.model.clone()),
        path: Some(
            info.waypoints
                .iter()
                .map(|w| WaypointRecord {
                    x: w.x,
                    y: w.y,
                    speed: w.speed,
                })
                .collect(),
        ),
        motion: Some(info.motion),
        start_time: info.start_time,
    }
}

/// Advances one car to `now`. Multiple segment boundaries may be crossed in
/// a single long frame; each handoff re-initializes the next segment with
/// the carried speed for entry-speed continuity.
pub fn advance_car(path: &mut CarPath, motion: &mut CarMotion, now: f32) {
    let CarState::FollowingPath {
        mut segment,
        mut started_at,
    } = motion.state
    else {
        return;
    };

    loop {
        let duration = path.segments[segment].duration().max(1e-6);
        let progress = ((now - started_at) / duration).clamp(0.0, 1.0);
        if progress < 1.0 {
            motion.pose = path.segments[segment].pose(progress);
            motion.state = CarState::FollowingPath {
                segment,
                started_at,
            };
            return;
        }

        let exit_speed = path.segments[segment].exit_speed();
        let mut next = segment + 1;
        if next >= path.segments.len() {
            match path.mode {
                MotionMode::Loop => next = 0,
                MotionMode::ForwardBackward => {
                    path.waypoints.reverse();
                    path.segments = compile_path(&path.waypoints, path.mode);
                    if path.segments.is_empty() {
                        motion.state = CarState::Idle;
                        return;
                    }
                    next = 0;
                }
                MotionMode::Forward => {
                    motion.pose = path.segments[segment].pose(1.0);
                    motion.state = CarState::Idle;
                    return;
                }
            }
        }

        started_at += duration;
        let v_next = next_entry_speed(&path.segments, next, path.mode);
        path.segments[next].initialize(exit_speed, v_next);
        segment = next;
    }
}

/// Runs every rendered frame. Reads only per-car state and the clock; the
/// grid is never touched from here.
pub fn drive_cars(time: Res<Time>, mut cars: Query<(&mut CarPath, &mut CarMotion)>) {
    let now = time.elapsed_secs();
    for (mut path, mut motion) in &mut cars {
        advance_car(&mut path, &mut motion, now);
    }
}

pub struct CarsPlugin;

impl Plugin for CarsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, drive_cars);
    }
}
