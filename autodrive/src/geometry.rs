//! Shared 2D intersection primitives used by the sensor array and the
//! collision detector.

use glam::Vec2;

const PARALLEL_EPSILON: f32 = 1e-6;

/// Distance along a unit-direction ray to its intersection with the segment
/// `[a, b]`. `None` when the segment is parallel, behind the origin, or the
/// hit falls outside the segment.
pub fn ray_segment_distance(origin: Vec2, direction: Vec2, a: Vec2, b: Vec2) -> Option<f32> {
    let v1 = a - origin;
    let v2 = b - a;
    let denom = direction.perp_dot(v2);

    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = v1.perp_dot(v2) / denom;
    let u = v1.perp_dot(direction) / denom;

    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

/// Bounded-segment vs bounded-segment intersection test: both parameters
/// must land in [0, 1].
pub fn segments_intersect(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let denom = d1.perp_dot(d2);

    if denom.abs() < PARALLEL_EPSILON {
        return false;
    }

    let v = p3 - p1;
    let t = v.perp_dot(d2) / denom;
    let u = v.perp_dot(d1) / denom;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Ray-casting parity test against an implicitly closed polygon. Polygons
/// with fewer than 3 points contain nothing. The strict inequality on one
/// endpoint gives each edge ownership of exactly one of its vertices, so a
/// probe through a shared vertex is not counted twice.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let cross_x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
