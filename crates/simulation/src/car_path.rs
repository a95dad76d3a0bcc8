//! Car path compilation and segment geometry.
//!
//! Turns an ordered waypoint polyline into timed geometric segments:
//! straight runs, tangent turning arcs, and 3-arc U-turn maneuvers for
//! near-reversal corners. Segments carry everything needed to interpolate
//! position, heading, and speed; the state machine in `cars` advances them
//! against the clock.
//!
//! All geometry is chained: each segment starts exactly where the previous
//! one ends, so continuity holds by construction. Straights and arcs are
//! laterally offset to the right of travel by the lane offset, which keeps
//! opposing directions on the same polyline from coinciding.

use std::f32::consts::{FRAC_PI_2, PI};

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{
    CAR_STRAIGHT_SPEED, CAR_TURN_SPEED, CAR_UTURN_SPEED, COLLINEAR_EPSILON, LANE_OFFSET,
    MAX_TURN_RADIUS, UTURN_RADIUS, UTURN_THRESHOLD,
};

/// Segments shorter than this are dropped instead of emitted.
const MIN_SEGMENT_LENGTH: f32 = 1e-4;

/// Speeds closer than this count as unchanged for easing selection.
const SPEED_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl Waypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, speed: None }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionMode {
    Forward,
    Loop,
    ForwardBackward,
}

/// Interpolated output of one drawing step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarPose {
    pub position: Vec2,
    pub heading: f32,
    pub speed: f32,
}

/// A straight run between two lane-offset points. Duration and easing are
/// fixed at `initialize` time from the entry/exit speed pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightSegment {
    pub start: Vec2,
    pub end: Vec2,
    pub max_speed: f32,
    entry_speed: f32,
    exit_speed: f32,
    ease: f32,
    duration: Option<f32>,
}

impl StraightSegment {
    fn new(start: Vec2, end: Vec2, max_speed: f32) -> Self {
        Self {
            start,
            end,
            max_speed,
            entry_speed: 0.0,
            exit_speed: 0.0,
            ease: 1.0,
            duration: None,
        }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn direction(&self) -> Vec2 {
        (self.end - self.start).normalize_or_zero()
    }
}

/// A circular arc. `radius` is the raw geometry on the waypoint line;
/// `adjusted_radius` folds in the lane offset (outside of a left turn,
/// inside of a right turn). `reverse` marks backward travel: the position
/// still follows the sweep, only the visual heading flips.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSegment {
    pub center: Vec2,
    pub radius: f32,
    pub adjusted_radius: f32,
    pub start_angle: f32,
    pub sweep: f32,
    pub reverse: bool,
    pub speed: f32,
}

impl ArcSegment {
    /// Builds the arc that starts at `pos` heading along `dir` and turns by
    /// `sweep` radians at the given radius.
    fn from_pose(pos: Vec2, dir: Vec2, radius: f32, sweep: f32, reverse: bool, speed: f32) -> Self {
        let side = if sweep >= 0.0 { 1.0 } else { -1.0 };
        let center = pos + dir.perp() * radius * side;
        let offset = pos - center;
        let start_angle = offset.y.atan2(offset.x);
        let adjusted_radius = (radius + LANE_OFFSET * side).max(radius * 0.25);
        Self {
            center,
            radius,
            adjusted_radius,
            start_angle,
            sweep,
            reverse,
            speed,
        }
    }

    fn angle_at(&self, progress: f32) -> f32 {
        self.start_angle + self.sweep * progress
    }

    /// Lane-offset position along the arc.
    pub fn point_at(&self, progress: f32) -> Vec2 {
        self.center + Vec2::from_angle(self.angle_at(progress)) * self.adjusted_radius
    }

    /// Travel tangent (radians) along the arc, before any reverse flip.
    pub fn direction_at(&self, progress: f32) -> f32 {
        self.angle_at(progress) + FRAC_PI_2.copysign(self.sweep)
    }

    /// Raw (un-offset) end point, used to chain the next segment.
    fn raw_end(&self) -> Vec2 {
        self.center + Vec2::from_angle(self.angle_at(1.0)) * self.radius
    }

    fn end_dir(&self) -> Vec2 {
        Vec2::from_angle(self.direction_at(1.0))
    }

    pub fn length(&self) -> f32 {
        self.sweep.abs() * self.adjusted_radius
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CarSegment {
    Straight(StraightSegment),
    Turning(ArcSegment),
    UTurn(ArcSegment),
}

impl CarSegment {
    /// The speed a vehicle is expected to have when entering this segment.
    /// Constant per kind: cornering is slower than cruising, reversing
    /// maneuvers slower still.
    pub fn max_entry_speed(&self) -> f32 {
        match self {
            CarSegment::Straight(s) => s.max_speed,
            CarSegment::Turning(_) => CAR_TURN_SPEED,
            CarSegment::UTurn(_) => CAR_UTURN_SPEED,
        }
    }

    /// Fixes duration and easing from the speed the vehicle carries in and
    /// the entry speed of whatever follows. Must be called before `duration`
    /// or `pose`; skipping it is a construction-order bug.
    pub fn initialize(&mut self, entry_speed: f32, next_entry_speed: f32) {
        match self {
            CarSegment::Straight(s) => {
                s.entry_speed = entry_speed;
                s.exit_speed = next_entry_speed;
                s.duration =
                    Some(2.0 * s.length() / (entry_speed + next_entry_speed).max(SPEED_EPSILON));
                s.ease = if next_entry_speed > entry_speed + SPEED_EPSILON {
                    2.0
                } else if next_entry_speed < entry_speed - SPEED_EPSILON {
                    0.5
                } else {
                    1.0
                };
            }
            // Arc timing is fixed by geometry and the constant segment speed.
            CarSegment::Turning(_) | CarSegment::UTurn(_) => {}
        }
    }

    pub fn duration(&self) -> f32 {
        match self {
            CarSegment::Straight(s) => s
                .duration
                .expect("straight segment queried before initialize"),
            CarSegment::Turning(a) | CarSegment::UTurn(a) => a.length() / a.speed,
        }
    }

    /// Speed the vehicle holds when this segment hands off.
    pub fn exit_speed(&self) -> f32 {
        match self {
            CarSegment::Straight(s) => s.exit_speed,
            CarSegment::Turning(a) | CarSegment::UTurn(a) => a.speed,
        }
    }

    /// Interpolated pose at `progress` in [0, 1].
    pub fn pose(&self, progress: f32) -> CarPose {
        match self {
            CarSegment::Straight(s) => {
                let eased = progress.powf(s.ease);
                let dir = s.direction();
                CarPose {
                    position: s.start.lerp(s.end, eased),
                    heading: dir.y.atan2(dir.x),
                    speed: s.entry_speed + (s.exit_speed - s.entry_speed) * progress,
                }
            }
            CarSegment::Turning(a) | CarSegment::UTurn(a) => {
                let mut heading = a.direction_at(progress);
                if a.reverse {
                    heading += PI;
                }
                CarPose {
                    position: a.point_at(progress),
                    heading,
                    speed: a.speed,
                }
            }
        }
    }

    pub fn start_position(&self) -> Vec2 {
        match self {
            CarSegment::Straight(s) => s.start,
            CarSegment::Turning(a) | CarSegment::UTurn(a) => a.point_at(0.0),
        }
    }

    pub fn end_position(&self) -> Vec2 {
        match self {
            CarSegment::Straight(s) => s.end,
            CarSegment::Turning(a) | CarSegment::UTurn(a) => a.point_at(1.0),
        }
    }

    /// Travel direction (radians) entering the segment, ignoring the
    /// reverse flip.
    pub fn start_direction(&self) -> f32 {
        match self {
            CarSegment::Straight(s) => {
                let d = s.direction();
                d.y.atan2(d.x)
            }
            CarSegment::Turning(a) | CarSegment::UTurn(a) => a.direction_at(0.0),
        }
    }

    pub fn end_direction(&self) -> f32 {
        match self {
            CarSegment::Straight(s) => {
                let d = s.direction();
                d.y.atan2(d.x)
            }
            CarSegment::Turning(a) | CarSegment::UTurn(a) => a.direction_at(1.0),
        }
    }

    pub fn is_reverse(&self) -> bool {
        match self {
            CarSegment::Straight(_) => false,
            CarSegment::Turning(a) | CarSegment::UTurn(a) => a.reverse,
        }
    }
}

/// How one corner of the polyline resolves geometrically.
enum Corner {
    /// Collinear: the path passes straight through the waypoint.
    Pass { at: Vec2 },
    /// Moderate turn: a single tangent arc between the legs.
    Arc { entry: Vec2, arc: ArcSegment },
    /// Near-reversal: straight into the corner, then a 3-arc maneuver.
    Maneuver { entry: Vec2, arcs: [ArcSegment; 3] },
}

impl Corner {
    fn entry(&self) -> Vec2 {
        match self {
            Corner::Pass { at } => *at,
            Corner::Arc { entry, .. } => *entry,
            Corner::Maneuver { entry, .. } => *entry,
        }
    }

    fn exit(&self) -> Vec2 {
        match self {
            Corner::Pass { at } => *at,
            Corner::Arc { arc, .. } => arc.raw_end(),
            Corner::Maneuver { arcs, .. } => arcs[2].raw_end(),
        }
    }
}

fn corner_geometry(prev: Vec2, current: Vec2, next: Vec2) -> Corner {
    let d1 = (current - prev).normalize_or_zero();
    let d2 = (next - current).normalize_or_zero();
    if d1 == Vec2::ZERO || d2 == Vec2::ZERO {
        return Corner::Pass { at: current };
    }

    let turn = d1.perp_dot(d2).atan2(d1.dot(d2));
    if turn.abs() < COLLINEAR_EPSILON {
        return Corner::Pass { at: current };
    }

    if turn.abs() < UTURN_THRESHOLD {
        // Tangent arc. The tangent length along each leg is r*tan(|turn|/2);
        // the radius is capped so the arc never consumes more than half of
        // either leg (adjacent corners share them) nor exceeds the segment's
        // own maximum.
        let tan_half = (turn.abs() * 0.5).tan();
        let max_leg = prev.distance(current).min(current.distance(next)) * 0.5;
        let radius = MAX_TURN_RADIUS.min(max_leg / tan_half.max(1e-6));
        let tangent = radius * tan_half;
        let entry = current - d1 * tangent;
        let arc = ArcSegment::from_pose(entry, d1, radius, turn, false, CAR_TURN_SPEED);
        Corner::Arc { entry, arc }
    } else {
        // 3-arc U-turn: out, reverse, back in, each sweeping a third of the
        // total heading change at the tight maneuver radius. The middle arc
        // is driven backward. The exit drifts off the raw polyline; the next
        // straight reconnects.
        let third = turn / 3.0;
        let out = ArcSegment::from_pose(current, d1, UTURN_RADIUS, third, false, CAR_UTURN_SPEED);
        let back = ArcSegment::from_pose(
            out.raw_end(),
            out.end_dir(),
            UTURN_RADIUS,
            third,
            true,
            CAR_UTURN_SPEED,
        );
        let back_in = ArcSegment::from_pose(
            back.raw_end(),
            back.end_dir(),
            UTURN_RADIUS,
            third,
            false,
            CAR_UTURN_SPEED,
        );
        Corner::Maneuver {
            entry: current,
            arcs: [out, back, back_in],
        }
    }
}

fn push_straight(segments: &mut Vec<CarSegment>, from: Vec2, to: Vec2, max_speed: f32) {
    if from.distance(to) < MIN_SEGMENT_LENGTH {
        return;
    }
    let dir = (to - from).normalize();
    let offset = Vec2::new(dir.y, -dir.x) * LANE_OFFSET;
    segments.push(CarSegment::Straight(StraightSegment::new(
        from + offset,
        to + offset,
        max_speed,
    )));
}

fn push_corner(segments: &mut Vec<CarSegment>, corner: &Corner) {
    match corner {
        Corner::Pass { .. } => {}
        Corner::Arc { arc, .. } => segments.push(CarSegment::Turning(arc.clone())),
        Corner::Maneuver { arcs, .. } => {
            for arc in arcs {
                segments.push(CarSegment::UTurn(arc.clone()));
            }
        }
    }
}

/// Compiles a waypoint polyline into drivable segments.
///
/// Looping paths wrap the corner window circularly; open paths have no
/// corner at either endpoint and skip the final leg when arc construction
/// already consumed it. Fewer than two waypoints yield no segments.
pub fn compile_path(waypoints: &[Waypoint], mode: MotionMode) -> Vec<CarSegment> {
    let points: Vec<Vec2> = waypoints.iter().map(Waypoint::position).collect();
    if points.len() < 2 {
        return Vec::new();
    }
    let speed_at = |i: usize| waypoints[i].speed.unwrap_or(CAR_STRAIGHT_SPEED);

    let mut segments = Vec::new();
    let n = points.len();

    if mode == MotionMode::Loop && n >= 3 {
        let corners: Vec<Corner> = (0..n)
            .map(|i| corner_geometry(points[(i + n - 1) % n], points[i], points[(i + 1) % n]))
            .collect();
        let mut cursor = corners[n - 1].exit();
        for (i, corner) in corners.iter().enumerate() {
            push_straight(&mut segments, cursor, corner.entry(), speed_at(i));
            push_corner(&mut segments, corner);
            cursor = corner.exit();
        }
    } else {
        let mut cursor = points[0];
        for i in 1..n - 1 {
            let corner = corner_geometry(points[i - 1], points[i], points[i + 1]);
            push_straight(&mut segments, cursor, corner.entry(), speed_at(i));
            push_corner(&mut segments, &corner);
            cursor = corner.exit();
        }
        push_straight(&mut segments, cursor, points[n - 1], speed_at(n - 1));
        if mode == MotionMode::Loop {
            // Degenerate 2-point loop: drive back along the other lane.
            push_straight(&mut segments, points[n - 1], points[0], speed_at(0));
        }
    }
    segments
}
