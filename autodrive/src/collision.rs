//! Boundary collision predicate for the car's rotated rectangle.

use glam::Vec2;

use crate::car::CarState;
use crate::geometry::{point_in_polygon, segments_intersect};
use crate::track::Boundary;

/// The car's rotated rectangle corners: front-left, front-right,
/// rear-right, rear-left.
pub fn car_corners(car: &CarState) -> [Vec2; 4] {
    let rot = Vec2::from_angle(car.rotation);
    let half_w = car.width / 2.0;
    let half_h = car.height / 2.0;

    [
        car.position + rot.rotate(Vec2::new(half_w, half_h)),
        car.position + rot.rotate(Vec2::new(half_w, -half_h)),
        car.position + rot.rotate(Vec2::new(-half_w, -half_h)),
        car.position + rot.rotate(Vec2::new(-half_w, half_h)),
    ]
}

/// True when any corner has left the outer polygon or entered the inner
/// polygon, or any car edge crosses an obstacle segment. Pure predicate:
/// the caller decides what a collision means.
pub fn check_collision(car: &CarState, boundary: &Boundary) -> bool {
    let corners = car_corners(car);

    for corner in corners {
        if !point_in_polygon(corner, &boundary.outer) {
            return true;
        }
        if point_in_polygon(corner, &boundary.inner) {
            return true;
        }
    }

    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        for obstacle in &boundary.obstacles {
            if segments_intersect(a, b, obstacle.start, obstacle.end) {
                return true;
            }
        }
    }

    false
}
