//! Arc segment geometry for detector cells
//!
//! In polar coordinates around the ring center, an arc segment is defined by:
//! - radius: distance from center
//! - thickness: radial extent (inner = radius - thickness/2, outer = radius + thickness/2)
//! - theta_start, theta_end: angular extent, half-open [start, end)

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::normalize_angle;

/// A thickened arc segment in polar space (relative to the ring center)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcSegment {
    /// Centerline radius from ring center
    pub radius: f32,
    /// Radial thickness (extends radius ± thickness/2)
    pub thickness: f32,
    /// Start angle (radians, normalized to [0, 2π))
    pub theta_start: f32,
    /// End angle (radians, normalized to [0, 2π))
    pub theta_end: f32,
}

impl ArcSegment {
    pub fn new(radius: f32, thickness: f32, theta_start: f32, theta_end: f32) -> Self {
        Self {
            radius,
            thickness,
            theta_start: normalize_angle(theta_start),
            theta_end: normalize_angle(theta_end),
        }
    }

    /// Arc of angular `width` centered on `theta`
    pub fn centered(radius: f32, thickness: f32, theta: f32, width: f32) -> Self {
        Self::new(radius, thickness, theta - width / 2.0, theta + width / 2.0)
    }

    #[inline]
    pub fn inner_radius(&self) -> f32 {
        self.radius - self.thickness / 2.0
    }

    #[inline]
    pub fn outer_radius(&self) -> f32 {
        self.radius + self.thickness / 2.0
    }

    /// Angular span of the arc (handles wraparound)
    pub fn angular_span(&self) -> f32 {
        let mut span = self.theta_end - self.theta_start;
        if span < 0.0 {
            span += std::f32::consts::TAU;
        }
        span
    }

    /// Mid angle of the arc, normalized
    pub fn mid_angle(&self) -> f32 {
        normalize_angle(self.theta_start + self.angular_span() / 2.0)
    }

    /// Check if an angle is within the arc's angular extent.
    ///
    /// The end is exclusive so neighbouring arcs never both claim a boundary angle.
    pub fn contains_angle(&self, theta: f32) -> bool {
        let theta = normalize_angle(theta);
        let start = self.theta_start;
        let end = self.theta_end;

        if start <= end {
            theta >= start && theta < end
        } else {
            // Wraparound case (e.g. the arc straddling angle 0)
            theta >= start || theta < end
        }
    }

    /// Check if a point (relative to the ring center) is inside the arc band
    pub fn contains_point(&self, point: Vec2) -> bool {
        let r = point.length();
        let theta = point.y.atan2(point.x);

        r >= self.inner_radius() && r <= self.outer_radius() && self.contains_angle(theta)
    }
}
