//! Deterministic simulation module
//!
//! All round logic lives here. Given a seed, everything is reproducible:
//! - Seeded RNG only (shape on the plain seed, emissions on their own stream)
//! - Time comes in from the host as milliseconds
//! - Stable iteration order (row-major cells, detector index)
//! - No rendering or platform dependencies

pub mod arc;
pub mod detector;
pub mod grid;
pub mod intersect;
pub mod physics;
pub mod scoring;
pub mod shapes;
pub mod state;
pub mod tick;

pub use arc::ArcSegment;
pub use detector::{Detector, DetectorRing, HitState, PendingHit};
pub use grid::{Cell, GridMapper, GuessMask, OccupancyGrid, cells_of};
pub use intersect::{ray_circle_intersection, ray_circle_params};
pub use physics::{DetectorHits, PetPhysics, PhotonEmission, ProbabilityZone, TofWindow};
pub use scoring::{ScoreReport, dice_score};
pub use shapes::{
    Archetype, boundary_positions, emission_sources, erode4, fill_holes, find_boundary,
    gaussian_filter, generate_shape, generate_shape_named, generate_shape_seeded,
};
pub use state::{EmissionRecord, Layout, RngState, RoundEvent, RoundPhase, RoundSession};
pub use tick::{TickInput, tick};
