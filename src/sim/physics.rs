//! Photon-pair physics
//!
//! An annihilation at a boundary pixel sends two photons in exactly opposite
//! directions. Each photon travels until it meets the detector ring; the
//! difference in path lengths becomes the TOF blink delay the learner sees.

use std::f32::consts::PI;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::detector::DetectorRing;
use super::grid::{Cell, GridMapper};
use super::intersect::ray_circle_intersection;
use crate::consts::{
    SIMULTANEOUS_EPSILON, ZONE_CENTER_RATIO, ZONE_MAX_SHIFT, ZONE_SAMPLE_STEP, ZONE_SIGMA_RATIO,
};
use crate::settings::SimConfig;
use crate::{distance, normalize_angle};

/// A single positron annihilation event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotonEmission {
    pub source: Vec2,
    /// Direction of photon 1 (radians, normalized); photon 2 goes the opposite way
    pub angle: f32,
}

impl PhotonEmission {
    pub fn new(source: Vec2, angle: f32) -> Self {
        Self {
            source,
            angle: normalize_angle(angle),
        }
    }

    /// The two photon directions, always π apart
    pub fn photon_directions(&self) -> (f32, f32) {
        (self.angle, normalize_angle(self.angle + PI))
    }
}

/// Which detectors a photon pair reached and how far each photon travelled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorHits {
    pub det1: usize,
    pub det2: usize,
    pub dist1: f32,
    pub dist2: f32,
}

impl DetectorHits {
    pub fn as_tuple(&self) -> (usize, usize, f32, f32) {
        (self.det1, self.det2, self.dist1, self.dist2)
    }
}

/// Cells along an LOR with their TOF likelihood
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityZone {
    pub cells: Vec<Cell>,
    pub intensities: Vec<f32>,
}

impl ProbabilityZone {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, f32)> + '_ {
        self.cells.iter().copied().zip(self.intensities.iter().copied())
    }

    /// Cell with the highest intensity (first one on ties)
    pub fn peak(&self) -> Option<(Cell, f32)> {
        self.iter().fold(None, |best, (cell, w)| match best {
            Some((_, bw)) if bw >= w => best,
            _ => Some((cell, w)),
        })
    }
}

/// TOF blink-delay window in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TofWindow {
    pub min_delay_ms: u32,
    pub max_delay_ms: u32,
}

impl TofWindow {
    #[inline]
    pub fn range(&self) -> u32 {
        self.max_delay_ms.saturating_sub(self.min_delay_ms)
    }
}

impl Default for TofWindow {
    fn default() -> Self {
        let config = SimConfig::default();
        Self {
            min_delay_ms: config.tof_min_delay_ms,
            max_delay_ms: config.tof_max_delay_ms,
        }
    }
}

/// PET physics calculations; stateless apart from the TOF window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PetPhysics {
    pub tof: TofWindow,
}

impl PetPhysics {
    pub fn new(tof: TofWindow) -> Self {
        Self { tof }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(TofWindow {
            min_delay_ms: config.tof_min_delay_ms,
            max_delay_ms: config.tof_max_delay_ms,
        })
    }

    /// Emission from `source`; a missing angle is drawn uniformly from [0, 2π)
    pub fn emit_from_pixel<R: Rng + ?Sized>(
        &self,
        source: Vec2,
        angle: Option<f32>,
        rng: &mut R,
    ) -> PhotonEmission {
        let angle = angle.unwrap_or_else(|| rng.random_range(0.0..std::f32::consts::TAU));
        PhotonEmission::new(source, angle)
    }

    /// Resolve the detectors reached by both photons.
    ///
    /// Falls back to detectors `(0, N/2)` with zero distances if either
    /// photon misses the ring, which only happens for sources on or outside it.
    pub fn find_detector_hits(&self, emission: &PhotonEmission, ring: &DetectorRing) -> DetectorHits {
        let (dir1, dir2) = emission.photon_directions();
        let hit1 = ray_circle_intersection(emission.source, dir1, ring.center(), ring.radius());
        let hit2 = ray_circle_intersection(emission.source, dir2, ring.center(), ring.radius());

        match (hit1.first(), hit2.first()) {
            (Some(&p1), Some(&p2)) => DetectorHits {
                det1: ring.find_closest_detector(p1),
                det2: ring.find_closest_detector(p2),
                dist1: distance(emission.source, p1),
                dist2: distance(emission.source, p2),
            },
            _ => {
                log::warn!(
                    "Photon pair from ({:.1}, {:.1}) missed the ring, using fallback detectors",
                    emission.source.x,
                    emission.source.y
                );
                DetectorHits {
                    det1: 0,
                    det2: ring.num_detectors() / 2,
                    dist1: 0.0,
                    dist2: 0.0,
                }
            }
        }
    }

    /// Blink delay difference for a path-length difference, in ms.
    ///
    /// Zero for simultaneous arrival, otherwise within [min, max] of the window
    /// and non-decreasing in `|dist1 - dist2|`.
    pub fn delay_difference(&self, dist1: f32, dist2: f32, max_possible_distance: f32) -> u32 {
        let diff = (dist1 - dist2).abs();
        if diff <= SIMULTANEOUS_EPSILON || max_possible_distance <= 0.0 {
            return 0;
        }
        let normalized = (diff / max_possible_distance).min(1.0);
        let min = self.tof.min_delay_ms as f32;
        let max = self.tof.max_delay_ms as f32;
        (min + normalized * (max - min)).round() as u32
    }

    /// `(delay1_ms, delay2_ms)`: the nearer detector blinks immediately,
    /// the other after the TOF delay. Ties favour photon 1.
    pub fn calculate_tof_delays(&self, dist1: f32, dist2: f32, max_possible_distance: f32) -> (u32, u32) {
        let delay = self.delay_difference(dist1, dist2, max_possible_distance);
        if dist1 <= dist2 { (0, delay) } else { (delay, 0) }
    }

    /// Gaussian likelihood of the source position along the LOR.
    ///
    /// `det1_pos` must be the detector that fired first; a larger delay
    /// difference moves the peak from the LOR midpoint toward it.
    pub fn calculate_probability_zone(
        &self,
        det1_pos: Vec2,
        det2_pos: Vec2,
        tof_delay_diff: f32,
        grid: &GridMapper,
    ) -> ProbabilityZone {
        let lor_length = distance(det1_pos, det2_pos);
        let step = grid.pixel_size * ZONE_SAMPLE_STEP;
        if lor_length <= f32::EPSILON || step <= 0.0 {
            return ProbabilityZone::default();
        }
        let dir = (det2_pos - det1_pos) / lor_length;

        let range = self.tof.range() as f32;
        let shift = if range > 0.0 {
            (tof_delay_diff / range).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let ratio = ZONE_CENTER_RATIO - shift * ZONE_MAX_SHIFT;
        let estimate = det1_pos + dir * (ratio * lor_length);
        let sigma = lor_length * ZONE_SIGMA_RATIO;

        let num_samples = (lor_length / step) as usize;
        let mut zone = ProbabilityZone::default();
        for i in 0..num_samples {
            let t = if num_samples > 1 {
                i as f32 / (num_samples - 1) as f32
            } else {
                0.5
            };
            let sample = det1_pos + dir * (t * lor_length);
            let Some(cell) = grid.world_to_pixel(sample) else {
                continue;
            };
            if zone.cells.contains(&cell) {
                continue;
            }
            let d = distance(sample, estimate);
            zone.cells.push(cell);
            zone.intensities.push((-(d * d) / (2.0 * sigma * sigma)).exp());
        }
        zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::f32::consts::TAU;

    fn ring() -> DetectorRing {
        DetectorRing::new(64, Vec2::new(400.0, 400.0), 300.0, 30.0, 600)
    }

    #[test]
    fn test_emit_uses_given_angle() {
        let physics = PetPhysics::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let e = physics.emit_from_pixel(Vec2::new(1.0, 2.0), Some(-PI / 2.0), &mut rng);
        assert!((e.angle - 1.5 * PI).abs() < 1e-5);
        assert_eq!(e.source, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_emit_random_angle_in_range_and_seeded() {
        let physics = PetPhysics::default();
        let mut a = Pcg32::seed_from_u64(9);
        let mut b = Pcg32::seed_from_u64(9);
        for _ in 0..100 {
            let ea = physics.emit_from_pixel(Vec2::ZERO, None, &mut a);
            let eb = physics.emit_from_pixel(Vec2::ZERO, None, &mut b);
            assert!((0.0..TAU).contains(&ea.angle));
            assert_eq!(ea, eb);
        }
    }

    #[test]
    fn test_hits_from_center_are_opposite() {
        let physics = PetPhysics::default();
        let ring = ring();
        let e = PhotonEmission::new(ring.center(), 0.0);
        let hits = physics.find_detector_hits(&e, &ring);
        assert_eq!(hits.det1, 0);
        assert_eq!(hits.det2, 32);
        assert!((hits.dist1 - 300.0).abs() < 1e-2);
        assert!((hits.dist1 - hits.dist2).abs() < 1e-2);
    }

    #[test]
    fn test_hits_off_center() {
        let physics = PetPhysics::default();
        let ring = ring();
        // 100 units right of center, photon 1 heading right
        let e = PhotonEmission::new(ring.center() + Vec2::new(100.0, 0.0), 0.0);
        let hits = physics.find_detector_hits(&e, &ring);
        assert_eq!((hits.det1, hits.det2), (0, 32));
        assert!((hits.dist1 - 200.0).abs() < 1e-2);
        assert!((hits.dist2 - 400.0).abs() < 1e-2);
    }

    #[test]
    fn test_hits_fallback_outside_ring() {
        let physics = PetPhysics::default();
        let ring = ring();
        // Far outside, photon 1 pointing away from the ring
        let e = PhotonEmission::new(ring.center() + Vec2::new(1000.0, 0.0), 0.0);
        let hits = physics.find_detector_hits(&e, &ring);
        assert_eq!(hits.as_tuple(), (0, 32, 0.0, 0.0));
    }

    #[test]
    fn test_tof_delays() {
        let physics = PetPhysics::default();
        assert_eq!(physics.calculate_tof_delays(100.0, 100.0, 600.0), (0, 0));
        assert_eq!(physics.calculate_tof_delays(100.0, 400.0, 600.0), (0, 275));
        assert_eq!(physics.calculate_tof_delays(400.0, 100.0, 600.0), (275, 0));
        // Differences beyond the max clamp to the max delay
        assert_eq!(physics.calculate_tof_delays(0.0, 900.0, 600.0), (0, 500));
        // Tiny but real difference still gets the minimum visible delay
        assert_eq!(physics.calculate_tof_delays(100.0, 100.5, 600.0), (0, 50));
    }

    #[test]
    fn test_tof_zero_max_distance_is_simultaneous() {
        let physics = PetPhysics::default();
        assert_eq!(physics.calculate_tof_delays(10.0, 20.0, 0.0), (0, 0));
    }

    fn zone_grid() -> GridMapper {
        GridMapper::new(20, Vec2::new(400.0, 400.0), 10.0)
    }

    #[test]
    fn test_zone_centered_without_delay() {
        let physics = PetPhysics::default();
        let grid = zone_grid();
        let det1 = Vec2::new(100.0, 405.0);
        let det2 = Vec2::new(700.0, 405.0);
        let zone = physics.calculate_probability_zone(det1, det2, 0.0, &grid);

        assert!(!zone.is_empty());
        assert_eq!(zone.cells.len(), zone.intensities.len());
        // Horizontal LOR through row 10 crosses every column once
        assert_eq!(zone.cells.len(), 20);
        let ((_, col), w) = zone.peak().unwrap();
        assert!((9..=10).contains(&col));
        assert!(w > 0.9);
    }

    #[test]
    fn test_zone_shifts_toward_earlier_detector() {
        let physics = PetPhysics::default();
        let grid = GridMapper::new(40, Vec2::new(400.0, 400.0), 10.0);
        let det1 = Vec2::new(100.0, 405.0);
        let det2 = Vec2::new(700.0, 405.0);

        let near = physics.calculate_probability_zone(det1, det2, 0.0, &grid);
        let far = physics.calculate_probability_zone(det1, det2, 450.0, &grid);
        let near_col = near.peak().unwrap().0.1;
        let far_col = far.peak().unwrap().0.1;
        assert!(far_col < near_col, "peak should move toward det1");
    }

    #[test]
    fn test_zone_cells_unique() {
        let physics = PetPhysics::default();
        let grid = zone_grid();
        let zone = physics.calculate_probability_zone(
            Vec2::new(150.0, 160.0),
            Vec2::new(640.0, 650.0),
            120.0,
            &grid,
        );
        let mut cells = zone.cells.clone();
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), zone.cells.len());
        assert!(zone.intensities.iter().all(|w| (0.0..=1.0).contains(w)));
    }

    #[test]
    fn test_zone_degenerate_lor() {
        let physics = PetPhysics::default();
        let p = Vec2::new(400.0, 400.0);
        assert!(physics.calculate_probability_zone(p, p, 0.0, &zone_grid()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_photons_antiparallel(angle in -100.0f32..100.0) {
            let e = PhotonEmission::new(Vec2::ZERO, angle);
            let (d1, d2) = e.photon_directions();
            prop_assert!((normalize_angle(d2 - d1) - PI).abs() < 1e-4);
        }

        #[test]
        fn prop_tof_monotonic(a in 0.0f32..600.0, b in 0.0f32..600.0, extra in 0.0f32..300.0) {
            let physics = PetPhysics::default();
            let d_small = physics.delay_difference(a, b, 600.0);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let d_large = physics.delay_difference(lo, hi + extra, 600.0);
            prop_assert!(d_large >= d_small);
            prop_assert!(d_small == 0 || (50..=500).contains(&d_small));
        }

        #[test]
        fn prop_nearer_detector_has_zero_delay(a in 0.0f32..600.0, b in 0.0f32..600.0) {
            let physics = PetPhysics::default();
            let (d1, d2) = physics.calculate_tof_delays(a, b, 600.0);
            if a < b {
                prop_assert_eq!(d1, 0);
            } else if b < a {
                prop_assert_eq!(d2, 0);
            }
        }

        #[test]
        fn prop_hits_from_inside_land_on_ring(
            r in 0.0f32..250.0,
            theta in 0.0f32..TAU,
            angle in 0.0f32..TAU,
        ) {
            let physics = PetPhysics::default();
            let ring = ring();
            let source = crate::point_on_circle(ring.center(), r, theta);
            let hits = physics.find_detector_hits(&PhotonEmission::new(source, angle), &ring);
            // Chord through the source: both legs add up to at most the diameter
            prop_assert!(hits.dist1 > 0.0 && hits.dist2 > 0.0);
            prop_assert!(hits.dist1 + hits.dist2 <= ring.diameter() + 1e-2);
            prop_assert!(hits.det1 != hits.det2);
        }
    }
}
