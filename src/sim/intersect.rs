//! Ray / circle intersection for photon paths
//!
//! Photons travel in straight lines from the annihilation point. Finding the
//! detector a photon reaches is a forward ray cast against the ring circle.

use glam::Vec2;

/// Intersections of the ray `origin + t * (cos angle, sin angle)` with a circle.
///
/// Only strictly forward hits (`t > 0`) are returned, nearest first. A ray
/// starting inside the circle yields exactly one point; a tangent ray may
/// yield the same point twice.
pub fn ray_circle_intersection(
    origin: Vec2,
    angle: f32,
    circle_center: Vec2,
    circle_radius: f32,
) -> Vec<Vec2> {
    let dir = Vec2::new(angle.cos(), angle.sin());
    ray_circle_params(origin, dir, circle_center, circle_radius)
        .into_iter()
        .map(|t| origin + dir * t)
        .collect()
}

/// Forward ray parameters `t` (ascending) where the ray meets the circle
pub fn ray_circle_params(origin: Vec2, dir: Vec2, circle_center: Vec2, circle_radius: f32) -> Vec<f32> {
    // Translate to circle-centered coordinates
    let f = origin - circle_center;

    let a = dir.length_squared();
    if a < f32::EPSILON {
        return Vec::new(); // Degenerate direction
    }
    let b = 2.0 * f.dot(dir);
    let c = f.length_squared() - circle_radius * circle_radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);

    // t1 <= t2 always, so filtering keeps ascending order
    [t1, t2].into_iter().filter(|&t| t > 0.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_ray_from_center_hits_once() {
        let hits = ray_circle_intersection(Vec2::ZERO, 0.0, Vec2::ZERO, 100.0);
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - Vec2::new(100.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_ray_from_inside_matches_analytic_root() {
        // Origin (30, 40) inside a radius-100 circle, heading +x.
        // x^2 + 40^2 = 100^2 -> x = sqrt(8400)
        let origin = Vec2::new(30.0, 40.0);
        let hits = ray_circle_intersection(origin, 0.0, Vec2::ZERO, 100.0);
        assert_eq!(hits.len(), 1);
        let expected_x = 8400.0_f32.sqrt();
        assert!((hits[0].x - expected_x).abs() < 1e-2);
        assert!((hits[0].y - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_ray_from_outside_toward_circle_hits_twice_nearest_first() {
        let origin = Vec2::new(-200.0, 0.0);
        let hits = ray_circle_intersection(origin, 0.0, Vec2::ZERO, 50.0);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].x - -50.0).abs() < 1e-3);
        assert!((hits[1].x - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_ray_from_outside_pointing_away_misses() {
        let origin = Vec2::new(-200.0, 0.0);
        assert!(ray_circle_intersection(origin, PI, Vec2::ZERO, 50.0).is_empty());
    }

    #[test]
    fn test_ray_missing_circle() {
        let origin = Vec2::new(-200.0, 80.0);
        assert!(ray_circle_intersection(origin, 0.0, Vec2::ZERO, 50.0).is_empty());
    }

    #[test]
    fn test_origin_on_circle_excludes_zero_t() {
        // Starting on the circle heading outward: t = 0 is not a hit
        let origin = Vec2::new(50.0, 0.0);
        let hits = ray_circle_intersection(origin, 0.0, Vec2::ZERO, 50.0);
        assert!(hits.is_empty());
        // Heading inward: only the far side
        let hits = ray_circle_intersection(origin, PI, Vec2::ZERO, 50.0);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].x - -50.0).abs() < 1e-3);
    }

    #[test]
    fn test_tangent_ray_returns_touching_point() {
        // Grazes the top of a radius-50 circle at (0, 50)
        let origin = Vec2::new(-100.0, 50.0);
        let hits = ray_circle_intersection(origin, 0.0, Vec2::ZERO, 50.0);
        assert!(!hits.is_empty() && hits.len() <= 2);
        assert!((hits[0] - Vec2::new(0.0, 50.0)).length() < 1e-3);
        for hit in &hits {
            assert!((hit.length() - 50.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_offset_circle_center() {
        let center = Vec2::new(400.0, 300.0);
        let hits = ray_circle_intersection(center, PI / 2.0, center, 120.0);
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - Vec2::new(400.0, 420.0)).length() < 1e-2);
    }
}
