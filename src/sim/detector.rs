//! Detector ring model
//!
//! N contiguous detector arcs around the imaging area. Each detector carries a
//! small hit/fade state machine driven by the host clock:
//! `Idle -> Hit -> (fading) -> Idle`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arc::ArcSegment;
use crate::{angle_from, angular_distance, point_on_circle};

/// Hit state of a single detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HitState {
    #[default]
    Idle,
    /// Lit at `hit_time` (ms) and fading out
    Hit { hit_time: u64 },
}

/// A single detector cell on the ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detector {
    pub index: usize,
    /// Center angle (radians, `index * 2π/N`)
    pub angle: f32,
    pub arc: ArcSegment,
    pub state: HitState,
    /// 1.0 right after a hit, linearly down to 0.0 over the blink duration
    pub blink_progress: f32,
}

impl Detector {
    pub fn new(index: usize, angle: f32, arc: ArcSegment) -> Self {
        Self {
            index,
            angle,
            arc,
            state: HitState::Idle,
            blink_progress: 0.0,
        }
    }

    /// Angular width of this detector's arc
    #[inline]
    pub fn arc_width(&self) -> f32 {
        self.arc.angular_span()
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self.state, HitState::Hit { .. })
    }

    pub fn trigger_hit(&mut self, now: u64) {
        self.state = HitState::Hit { hit_time: now };
        self.blink_progress = 1.0;
    }

    /// Advance the linear fade; drops back to Idle once the blink has elapsed
    pub fn update(&mut self, now: u64, blink_duration: u64) {
        if let HitState::Hit { hit_time } = self.state {
            let elapsed = now.saturating_sub(hit_time);
            if elapsed < blink_duration {
                self.blink_progress = 1.0 - elapsed as f32 / blink_duration as f32;
            } else {
                self.state = HitState::Idle;
                self.blink_progress = 0.0;
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = HitState::Idle;
        self.blink_progress = 0.0;
    }
}

/// A detector activation waiting for its trigger time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHit {
    pub detector: usize,
    pub trigger_time: u64,
}

/// Circular arrangement of detectors around the image matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorRing {
    center: Vec2,
    radius: f32,
    blink_duration: u64,
    detectors: Vec<Detector>,
    /// Pending hits, in scheduling order
    pending: Vec<PendingHit>,
}

impl DetectorRing {
    /// Build a ring of `num_detectors` back-to-back arcs.
    ///
    /// # Panics
    /// If `num_detectors < 2` or `radius` is not positive. Validate the round
    /// setup first to get a `ConfigError` instead.
    pub fn new(
        num_detectors: usize,
        center: Vec2,
        radius: f32,
        thickness: f32,
        blink_duration: u64,
    ) -> Self {
        assert!(num_detectors >= 2, "a detector ring needs at least 2 detectors");
        assert!(radius > 0.0, "detector ring radius must be positive");

        let spacing = std::f32::consts::TAU / num_detectors as f32;
        let detectors = (0..num_detectors)
            .map(|i| {
                let angle = i as f32 * spacing;
                Detector::new(i, angle, ArcSegment::centered(radius, thickness, angle, spacing))
            })
            .collect();

        Self {
            center,
            radius,
            blink_duration,
            detectors,
            pending: Vec::new(),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Longest possible photon path difference inside the ring
    #[inline]
    pub fn diameter(&self) -> f32 {
        self.radius * 2.0
    }

    #[inline]
    pub fn num_detectors(&self) -> usize {
        self.detectors.len()
    }

    /// Angular spacing between detector centers (also each arc's width)
    #[inline]
    pub fn spacing(&self) -> f32 {
        std::f32::consts::TAU / self.detectors.len() as f32
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn detector(&self, index: usize) -> Option<&Detector> {
        self.detectors.get(index)
    }

    pub fn pending_hits(&self) -> &[PendingHit] {
        &self.pending
    }

    /// World position of a detector's center on the ring
    pub fn detector_position(&self, index: usize) -> Option<Vec2> {
        self.detectors
            .get(index)
            .map(|d| point_on_circle(self.center, self.radius, d.angle))
    }

    /// Index of the detector whose center angle is closest to `point`.
    ///
    /// Ties go to the lowest index.
    pub fn find_closest_detector(&self, point: Vec2) -> usize {
        let angle = angle_from(self.center, point);
        self.detectors
            .iter()
            .map(|d| (d.index, angular_distance(angle, d.angle)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    /// Detector whose arc band contains a world point (e.g. a click on the ring)
    pub fn detector_at(&self, point: Vec2) -> Option<usize> {
        let rel = point - self.center;
        self.detectors
            .iter()
            .find(|d| d.arc.contains_point(rel))
            .map(|d| d.index)
    }

    /// Light a detector immediately. Out-of-range indices are ignored.
    pub fn trigger_hit(&mut self, index: usize, now: u64) {
        if let Some(detector) = self.detectors.get_mut(index) {
            detector.trigger_hit(now);
        } else {
            log::warn!("Ignoring hit on unknown detector {}", index);
        }
    }

    /// Queue a hit for `now + delay`; detector state is untouched until then
    pub fn schedule_hit(&mut self, index: usize, delay: u64, now: u64) {
        self.pending.push(PendingHit {
            detector: index,
            trigger_time: now + delay,
        });
    }

    /// Promote due pending hits, then fade every detector
    pub fn update(&mut self, now: u64) {
        let mut remaining = Vec::with_capacity(self.pending.len());
        for hit in std::mem::take(&mut self.pending) {
            if now >= hit.trigger_time {
                self.trigger_hit(hit.detector, now);
            } else {
                remaining.push(hit);
            }
        }
        self.pending = remaining;

        let blink = self.blink_duration;
        for detector in &mut self.detectors {
            detector.update(now, blink);
        }
    }

    /// First two lit detectors by index, if at least two are lit
    pub fn get_active_lor(&self) -> Option<(usize, usize)> {
        let mut lit = self.detectors.iter().filter(|d| d.is_hit()).map(|d| d.index);
        match (lit.next(), lit.next()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// Drop hits that have not fired yet
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Back to a dark ring with nothing queued
    pub fn reset(&mut self) {
        self.clear_pending();
        for detector in &mut self.detectors {
            detector.reset();
        }
    }
}
