//! Round state
//!
//! Everything one round needs lives here: the hidden shape, the ring, the
//! shuffled emission queue and the learner's guesses. All randomness comes
//! from the round seed, so a seed replays the same round.

use std::collections::VecDeque;

use glam::Vec2;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::detector::DetectorRing;
use super::grid::{Cell, GridMapper, GuessMask, OccupancyGrid};
use super::physics::{DetectorHits, PetPhysics, PhotonEmission, ProbabilityZone};
use super::scoring::ScoreReport;
use super::shapes::{emission_sources, fill_holes, generate_shape_seeded};
use crate::settings::{ConfigError, RoundSetup, SimConfig};

/// Stream used for the emission order and angles (shape generation uses the plain seed)
const EMISSION_STREAM: u64 = 1;

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Emissions firing; clicks add guesses
    Acquiring,
    /// All emissions done; clicks toggle guesses
    Correction,
    /// Scored
    Results,
}

/// One fired emission, as the host needs it for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub cell: Cell,
    pub emission: PhotonEmission,
    pub hits: DetectorHits,
    /// (delay1_ms, delay2_ms) for det1 / det2
    pub delays: (u32, u32),
    pub fired_at: u64,
}

impl EmissionRecord {
    /// Detector that blinks first, then the one that blinks second
    pub fn blink_order(&self) -> (usize, usize) {
        if self.delays.0 <= self.delays.1 {
            (self.hits.det1, self.hits.det2)
        } else {
            (self.hits.det2, self.hits.det1)
        }
    }

    /// Time between the two blinks
    pub fn delay_difference(&self) -> u32 {
        self.delays.0.abs_diff(self.delays.1)
    }
}

/// Events for the host (sound, HUD); drained each frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoundEvent {
    EmissionFired(EmissionRecord),
    PhaseChanged(RoundPhase),
    Scored(ScoreReport),
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn with_stream(seed: u64, stream: u64) -> Self {
        Self { seed, stream }
    }

    pub fn to_rng(&self) -> Pcg32 {
        if self.stream == 0 {
            Pcg32::seed_from_u64(self.seed)
        } else {
            Pcg32::new(self.seed, self.stream)
        }
    }
}

/// Screen geometry for a round, derived from the square game area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub center: Vec2,
    pub ring_radius: f32,
    pub pixel_size: f32,
}

impl Layout {
    pub fn from_area(center: Vec2, area_size: f32, grid_size: usize, config: &SimConfig) -> Self {
        let matrix_size = area_size * config.matrix_size_ratio;
        Self {
            center,
            ring_radius: area_size * config.ring_radius_ratio,
            pixel_size: matrix_size / grid_size.max(1) as f32,
        }
    }

    /// The ring must enclose the whole matrix, corners included
    pub fn validate(&self, grid_size: usize) -> Result<(), ConfigError> {
        if self.ring_radius.is_nan() || self.ring_radius <= 0.0 {
            return Err(ConfigError::InvalidGeometry(format!(
                "ring radius {} must be positive",
                self.ring_radius
            )));
        }
        if self.pixel_size.is_nan() || self.pixel_size <= 0.0 {
            return Err(ConfigError::InvalidGeometry(format!(
                "pixel size {} must be positive",
                self.pixel_size
            )));
        }
        let half_diagonal = grid_size as f32 * self.pixel_size * std::f32::consts::FRAC_1_SQRT_2;
        if half_diagonal >= self.ring_radius {
            return Err(ConfigError::InvalidGeometry(format!(
                "matrix corners ({:.1}) reach past the ring radius ({:.1})",
                half_diagonal, self.ring_radius
            )));
        }
        Ok(())
    }
}

/// A single round: hidden shape, detector ring, emissions and guesses
#[derive(Debug, Clone)]
pub struct RoundSession {
    pub config: SimConfig,
    pub setup: RoundSetup,
    /// Resolved seed (also stored in `setup.seed`)
    pub seed: u64,
    pub phase: RoundPhase,
    pub ring: DetectorRing,
    pub grid: GridMapper,
    pub physics: PetPhysics,
    true_mask: OccupancyGrid,
    sources: Vec<Cell>,
    queue: VecDeque<Cell>,
    pub guesses: GuessMask,
    pub emissions_fired: usize,
    pub last_emission_time: u64,
    pub lor_display_time: u64,
    pub last_emission: Option<EmissionRecord>,
    /// Tutorial overlay for the last emission
    pub probability_zone: Option<ProbabilityZone>,
    pub score: Option<ScoreReport>,
    events: Vec<RoundEvent>,
    rng: Pcg32,
}

impl RoundSession {
    /// Start a round at time `now` (ms)
    pub fn new(
        setup: RoundSetup,
        layout: Layout,
        config: SimConfig,
        now: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        setup.validate()?;
        layout.validate(setup.grid_size)?;

        let seed = setup.seed.unwrap_or_else(rand::random::<u64>);
        let setup = RoundSetup {
            seed: Some(seed),
            ..setup
        };

        let true_mask = generate_shape_seeded(setup.archetype, setup.grid_size, Some(seed));
        let sources = emission_sources(&true_mask);

        let mut rng = RngState::with_stream(seed, EMISSION_STREAM).to_rng();
        let mut order = sources.clone();
        order.shuffle(&mut rng);

        let mut ring = DetectorRing::new(
            setup.num_detectors,
            layout.center,
            layout.ring_radius,
            config.detector_thickness,
            config.blink_duration_ms,
        );
        ring.reset();

        log::info!(
            "Round start: {} on {}x{} grid, {} detectors, seed {}, {} emissions",
            setup.archetype.as_str(),
            setup.grid_size,
            setup.grid_size,
            setup.num_detectors,
            seed,
            order.len()
        );

        Ok(Self {
            physics: PetPhysics::from_config(&config),
            grid: GridMapper::new(setup.grid_size, layout.center, layout.pixel_size),
            config,
            setup,
            seed,
            phase: RoundPhase::Acquiring,
            ring,
            true_mask,
            sources,
            queue: order.into(),
            guesses: GuessMask::new(),
            emissions_fired: 0,
            last_emission_time: now,
            lor_display_time: now,
            last_emission: None,
            probability_zone: None,
            score: None,
            events: Vec::new(),
            rng,
        })
    }

    /// Same setup and layout, new random seed (never the current one)
    pub fn restart(&self, now: u64) -> Result<Self, ConfigError> {
        let mut seed = rand::random::<u64>();
        while seed == self.seed {
            seed = rand::random::<u64>();
        }
        let setup = RoundSetup {
            seed: Some(seed),
            ..self.setup.clone()
        };
        let layout = Layout {
            center: self.grid.center,
            ring_radius: self.ring.radius(),
            pixel_size: self.grid.pixel_size,
        };
        Self::new(setup, layout, self.config.clone(), now)
    }

    pub fn true_mask(&self) -> &OccupancyGrid {
        &self.true_mask
    }

    /// Boundary cells (or all cells for degenerate shapes), row-major
    pub fn emission_sources(&self) -> &[Cell] {
        &self.sources
    }

    pub fn total_emissions(&self) -> usize {
        self.sources.len()
    }

    pub fn remaining_emissions(&self) -> usize {
        self.queue.len()
    }

    /// Pair of currently lit detectors, if any
    pub fn active_lor(&self) -> Option<(usize, usize)> {
        self.ring.get_active_lor()
    }

    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn set_phase(&mut self, phase: RoundPhase) {
        if self.phase != phase {
            log::info!("Round phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.events.push(RoundEvent::PhaseChanged(phase));
        }
    }

    /// Fire the next queued emission with a random angle
    pub fn fire_emission(&mut self, now: u64) -> Option<EmissionRecord> {
        self.fire_emission_at_angle(now, None)
    }

    /// Fire the next queued emission; `angle` overrides the random direction
    pub fn fire_emission_at_angle(&mut self, now: u64, angle: Option<f32>) -> Option<EmissionRecord> {
        let cell = self.queue.pop_front()?;
        let source = self.grid.pixel_to_world(cell.0, cell.1);

        let emission = self.physics.emit_from_pixel(source, angle, &mut self.rng);
        let hits = self.physics.find_detector_hits(&emission, &self.ring);
        let delays = self
            .physics
            .calculate_tof_delays(hits.dist1, hits.dist2, self.ring.diameter());

        self.ring.schedule_hit(hits.det1, delays.0 as u64, now);
        self.ring.schedule_hit(hits.det2, delays.1 as u64, now);

        let record = EmissionRecord {
            cell,
            emission,
            hits,
            delays,
            fired_at: now,
        };

        self.probability_zone = if self.config.show_probability_zone {
            self.probability_zone_for(&record)
        } else {
            None
        };

        log::debug!(
            "Emission {} from {:?}: detectors {} / {}, distances {:.1} / {:.1}, delays {} / {} ms",
            self.emissions_fired + 1,
            cell,
            hits.det1,
            hits.det2,
            hits.dist1,
            hits.dist2,
            delays.0,
            delays.1
        );

        self.emissions_fired += 1;
        self.last_emission_time = now;
        self.lor_display_time = now;
        self.last_emission = Some(record.clone());
        self.events.push(RoundEvent::EmissionFired(record.clone()));
        Some(record)
    }

    /// TOF likelihood along the LOR of `record`, peaked toward the detector
    /// that blinked first
    pub fn probability_zone_for(&self, record: &EmissionRecord) -> Option<ProbabilityZone> {
        let (first, second) = record.blink_order();
        let p1 = self.ring.detector_position(first)?;
        let p2 = self.ring.detector_position(second)?;
        Some(self.physics.calculate_probability_zone(
            p1,
            p2,
            record.delay_difference() as f32,
            &self.grid,
        ))
    }

    /// Learner click at a world point. Adds while acquiring, toggles during
    /// correction. Returns the affected cell.
    pub fn handle_click(&mut self, point: Vec2) -> Option<Cell> {
        let (row, col) = self.grid.world_to_pixel(point)?;
        match self.phase {
            RoundPhase::Acquiring => {
                self.guesses.add(row, col);
            }
            RoundPhase::Correction => {
                self.guesses.toggle(row, col);
            }
            RoundPhase::Results => return None,
        }
        Some((row, col))
    }

    pub fn clear_guesses(&mut self) {
        if self.phase != RoundPhase::Results {
            self.guesses.clear();
        }
    }

    /// Fill the marked outline, score it and move to Results.
    ///
    /// Only valid during correction; returns the existing score otherwise.
    pub fn finalize(&mut self) -> Option<ScoreReport> {
        if self.phase != RoundPhase::Correction {
            return self.score;
        }
        let filled = fill_holes(&self.guesses.to_mask(self.grid.grid_size));
        self.guesses.set_from_mask(&filled);

        let report = ScoreReport::compute(&self.true_mask, &self.guesses);
        log::info!(
            "Round scored: dice {:.3} ({} true, {} guessed, {} correct)",
            report.dice,
            report.true_count,
            report.guessed_count,
            report.correct_count
        );
        self.score = Some(report);
        self.events.push(RoundEvent::Scored(report));
        self.set_phase(RoundPhase::Results);
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Difficulty;

    fn layout(grid_size: usize) -> Layout {
        Layout::from_area(Vec2::new(500.0, 500.0), 800.0, grid_size, &SimConfig::default())
    }

    fn session(difficulty: Difficulty, seed: u64) -> RoundSession {
        let setup = RoundSetup::from_difficulty(difficulty, Some(seed));
        RoundSession::new(setup, layout(difficulty.grid_size()), SimConfig::default(), 0).unwrap()
    }

    #[test]
    fn test_layout_from_area() {
        let l = layout(10);
        assert!((l.ring_radius - 336.0).abs() < 1e-3);
        assert!((l.pixel_size - 44.0).abs() < 1e-3);
        assert!(l.validate(10).is_ok());
    }

    #[test]
    fn test_layout_rejects_matrix_outside_ring() {
        let l = Layout {
            center: Vec2::ZERO,
            ring_radius: 100.0,
            pixel_size: 20.0,
        };
        assert!(matches!(l.validate(10), Err(ConfigError::InvalidGeometry(_))));
    }

    #[test]
    fn test_new_session_rejects_bad_setup() {
        let mut setup = RoundSetup::from_difficulty(Difficulty::Easy, Some(1));
        setup.num_detectors = 1;
        let err = RoundSession::new(setup, layout(14), SimConfig::default(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::TooFewDetectors { .. }));
    }

    #[test]
    fn test_session_replays_from_seed() {
        let mut a = session(Difficulty::Medium, 77);
        let mut b = session(Difficulty::Medium, 77);
        assert_eq!(a.true_mask(), b.true_mask());
        assert_eq!(a.total_emissions(), b.total_emissions());
        for t in 0..5 {
            assert_eq!(a.fire_emission(t * 100), b.fire_emission(t * 100));
        }
    }

    #[test]
    fn test_queue_is_a_permutation_of_sources() {
        let mut s = session(Difficulty::Hard, 5);
        let mut fired = Vec::new();
        while let Some(record) = s.fire_emission(0) {
            fired.push(record.cell);
        }
        let mut expected = s.emission_sources().to_vec();
        fired.sort();
        expected.sort();
        assert_eq!(fired, expected);
        assert_eq!(s.remaining_emissions(), 0);
    }

    #[test]
    fn test_fire_schedules_both_detectors() {
        let mut s = session(Difficulty::VeryEasy, 3);
        let record = s.fire_emission(1000).unwrap();
        let pending = s.ring.pending_hits();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].detector, record.hits.det1);
        assert_eq!(pending[0].trigger_time, 1000 + record.delays.0 as u64);
        assert_eq!(pending[1].trigger_time, 1000 + record.delays.1 as u64);
        assert!(record.delays.0 == 0 || record.delays.1 == 0);
        assert!(matches!(s.drain_events()[0], RoundEvent::EmissionFired(_)));
    }

    #[test]
    fn test_probability_zone_only_in_tutorial() {
        let mut s = session(Difficulty::Easy, 9);
        s.fire_emission(0);
        assert!(s.probability_zone.is_none());

        let setup = RoundSetup::from_difficulty(Difficulty::Easy, Some(9));
        let mut t = RoundSession::new(setup, layout(14), SimConfig::tutorial(), 0).unwrap();
        t.fire_emission(0);
        let zone = t.probability_zone.as_ref().unwrap();
        assert!(!zone.is_empty());
    }

    #[test]
    fn test_clicks_add_then_toggle() {
        let mut s = session(Difficulty::VeryEasy, 1);
        let p = s.grid.pixel_to_world(2, 3);
        assert_eq!(s.handle_click(p), Some((2, 3)));
        s.handle_click(p);
        assert!(s.guesses.contains(2, 3));

        s.set_phase(RoundPhase::Correction);
        s.handle_click(p);
        assert!(!s.guesses.contains(2, 3));
        assert_eq!(s.handle_click(Vec2::new(-1000.0, 0.0)), None);
    }

    #[test]
    fn test_finalize_fills_and_scores_truth() {
        let mut s = session(Difficulty::Medium, 12);
        // Marking exactly the boundary reconstructs the whole shape
        // when the shape has no holes
        for &(r, c) in s.emission_sources().to_vec().iter() {
            s.guesses.add(r, c);
        }
        assert!(s.finalize().is_none(), "finalize is only allowed in correction");

        s.set_phase(RoundPhase::Correction);
        let report = s.finalize().unwrap();
        assert_eq!(s.phase, RoundPhase::Results);
        assert!(report.dice > 0.9);
        assert_eq!(s.finalize(), Some(report));
    }

    #[test]
    fn test_rng_state_streams_differ() {
        use rand::Rng;
        let mut a = RngState::new(4).to_rng();
        let mut b = RngState::with_stream(4, EMISSION_STREAM).to_rng();
        let xs: Vec<u32> = (0..4).map(|_| a.random()).collect();
        let ys: Vec<u32> = (0..4).map(|_| b.random()).collect();
        assert_ne!(xs, ys);
    }
}
