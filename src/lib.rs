//! GuessTheSignal - a PET imaging teaching simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (shapes, detector ring, photon physics, scoring, rounds)
//! - `settings`: Timing/layout configuration and difficulty presets
//! - `cli`: Arguments for the headless driver

pub mod cli;
pub mod settings;
pub mod sim;

pub use settings::{ConfigError, Difficulty, SimConfig};

use glam::Vec2;

/// Fixed simulation constants
pub mod consts {
    /// Smallest grid the shape generator is expected to handle
    pub const MIN_GRID_SIZE: usize = 8;
    /// A ring needs at least two detectors to form a line of response
    pub const MIN_DETECTORS: usize = 2;

    /// Detector count used by every difficulty preset
    pub const DEFAULT_DETECTORS: usize = 64;

    /// Probability zone: peak position along the LOR at zero delay (ratio from det1)
    pub const ZONE_CENTER_RATIO: f32 = 0.5;
    /// Probability zone: maximum shift of the peak toward the earlier detector
    pub const ZONE_MAX_SHIFT: f32 = 0.4;
    /// Probability zone: Gaussian sigma as a fraction of the LOR length
    pub const ZONE_SIGMA_RATIO: f32 = 0.15;
    /// Probability zone: sample step as a fraction of the pixel size
    pub const ZONE_SAMPLE_STEP: f32 = 0.5;

    /// Distances closer than this count as simultaneous arrival (world units)
    pub const SIMULTANEOUS_EPSILON: f32 = 1e-4;

    /// Threshold used to re-binarize smoothed masks
    pub const MASK_THRESHOLD: f32 = 0.5;
}

/// Normalized angle to [0, 2π)
///
/// Works for any finite input, including angles many revolutions away.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::TAU;
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Shortest unsigned angular distance between two angles, in [0, π]
#[inline]
pub fn angular_distance(a: f32, b: f32) -> f32 {
    use std::f32::consts::TAU;
    let diff = normalize_angle(a - b);
    diff.min(TAU - diff)
}

/// Euclidean distance between two points
#[inline]
pub fn distance(p1: Vec2, p2: Vec2) -> f32 {
    p1.distance(p2)
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Point on a circle around `center` at the given angle
#[inline]
pub fn point_on_circle(center: Vec2, radius: f32, angle: f32) -> Vec2 {
    center + polar_to_cartesian(radius, angle)
}

/// Angle of `point` as seen from `center`, normalized to [0, 2π)
#[inline]
pub fn angle_from(center: Vec2, point: Vec2) -> f32 {
    let d = point - center;
    normalize_angle(d.y.atan2(d.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::{PI, TAU};

    #[test]
    fn test_normalize_angle_basic() {
        assert!((normalize_angle(-PI / 2.0) - 1.5 * PI).abs() < 1e-5);
        assert!((normalize_angle(TAU) - 0.0).abs() < 1e-6);
        assert!((normalize_angle(5.0 * TAU + 1.0) - 1.0).abs() < 1e-3);
        assert_eq!(normalize_angle(-1e-9), 0.0);
    }

    #[test]
    fn test_angular_distance_wraps() {
        assert!((angular_distance(0.1, TAU - 0.1) - 0.2).abs() < 1e-5);
        assert!((angular_distance(0.0, PI) - PI).abs() < 1e-6);
    }

    #[test]
    fn test_point_on_circle() {
        let p = point_on_circle(Vec2::new(10.0, 20.0), 5.0, PI / 2.0);
        assert!((p.x - 10.0).abs() < 1e-5);
        assert!((p.y - 25.0).abs() < 1e-5);
        assert!((distance(p, Vec2::new(10.0, 20.0)) - 5.0).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_normalize_angle_in_range(angle in -1.0e4f32..1.0e4f32) {
            let n = normalize_angle(angle);
            prop_assert!((0.0..TAU).contains(&n));
            // Same direction as the input
            prop_assert!((n.cos() - angle.cos()).abs() < 1e-2);
            prop_assert!((n.sin() - angle.sin()).abs() < 1e-2);
        }
    }
}
