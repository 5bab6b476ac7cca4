//! Five-ray forward range sensor. Rays are cast from the heading side of
//! the car against the track boundary polygons and any obstacle segments.

use std::f32::consts::PI;

use glam::Vec2;

use crate::car::CarState;
use crate::geometry::ray_segment_distance;
use crate::track::Boundary;

pub const RAY_COUNT: usize = 5;
/// Saturation range: a ray with no hit reports exactly this distance,
/// meaning "clear to sensor range", not "no data".
pub const SENSOR_RANGE: f32 = 1000.0;
/// Angular offset between adjacent rays. The fan spans heading ± 2 steps,
/// a ±45° forward cone.
pub const SENSOR_ANGLE_STEP: f32 = PI / 8.0;

/// Per-ray nearest-hit distances, left to right across the fan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarDistances {
    pub far_left: f32,
    pub mid_left: f32,
    pub center: f32,
    pub mid_right: f32,
    pub far_right: f32,
}

impl RadarDistances {
    /// All rays clear to sensor range.
    pub fn saturated() -> Self {
        Self {
            far_left: SENSOR_RANGE,
            mid_left: SENSOR_RANGE,
            center: SENSOR_RANGE,
            mid_right: SENSOR_RANGE,
            far_right: SENSOR_RANGE,
        }
    }

    pub fn as_array(&self) -> [f32; RAY_COUNT] {
        [
            self.far_left,
            self.mid_left,
            self.center,
            self.mid_right,
            self.far_right,
        ]
    }
}

/// Recompute all five distances for the current car pose. Pure with respect
/// to its inputs: the same pose and boundary always yield the same rays.
pub fn update(car: &CarState, boundary: &Boundary) -> RadarDistances {
    let rot = Vec2::from_angle(car.rotation);
    let half_w = car.width / 2.0;
    let half_h = car.height / 2.0;

    let front_left = car.position + rot.rotate(Vec2::new(half_w, half_h));
    let front_center = car.position + rot.rotate(Vec2::new(half_w, 0.0));
    let front_right = car.position + rot.rotate(Vec2::new(half_w, -half_h));

    // Left to right across the fan. Side rays originate at the front corner
    // on their side, the center ray at the front edge midpoint.
    let rays = [
        (front_left, 2.0),
        (front_left, 1.0),
        (front_center, 0.0),
        (front_right, -1.0),
        (front_right, -2.0),
    ];

    let mut distances = [SENSOR_RANGE; RAY_COUNT];
    for (slot, (origin, step)) in distances.iter_mut().zip(rays) {
        let direction = Vec2::from_angle(car.rotation + step * SENSOR_ANGLE_STEP);
        *slot = cast_ray(origin, direction, boundary);
    }

    RadarDistances {
        far_left: distances[0],
        mid_left: distances[1],
        center: distances[2],
        mid_right: distances[3],
        far_right: distances[4],
    }
}

fn cast_ray(origin: Vec2, direction: Vec2, boundary: &Boundary) -> f32 {
    let mut best = SENSOR_RANGE;
    best = closest_hit_in_polygon(origin, direction, &boundary.outer, best);
    best = closest_hit_in_polygon(origin, direction, &boundary.inner, best);

    for obstacle in &boundary.obstacles {
        if let Some(distance) = ray_segment_distance(origin, direction, obstacle.start, obstacle.end)
        {
            if distance < best {
                best = distance;
            }
        }
    }

    best
}

fn closest_hit_in_polygon(origin: Vec2, direction: Vec2, polygon: &[Vec2], mut best: f32) -> f32 {
    if polygon.len() < 2 {
        return best;
    }

    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        if let Some(distance) = ray_segment_distance(origin, direction, a, b) {
            if distance < best {
                best = distance;
            }
        }
    }

    best
}
