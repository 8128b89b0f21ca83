//! Simulation configuration and difficulty presets
//!
//! Everything timing- or layout-related lives in `SimConfig`, which is passed
//! into the components that need it. It can be loaded from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_DETECTORS, MIN_DETECTORS, MIN_GRID_SIZE};
use crate::sim::Archetype;

/// Errors raised while loading or validating configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    GridTooSmall { grid_size: usize, min: usize },
    TooFewDetectors { detectors: usize, min: usize },
    InvalidGeometry(String),
    InvalidTiming(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "Config parse error: {}", e),
            ConfigError::GridTooSmall { grid_size, min } => {
                write!(f, "Grid size {} is below the minimum of {}", grid_size, min)
            }
            ConfigError::TooFewDetectors { detectors, min } => {
                write!(f, "{} detectors given, at least {} required", detectors, min)
            }
            ConfigError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            ConfigError::InvalidTiming(msg) => write!(f, "Invalid timing: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Difficulty levels; every level uses 64 detectors, only the matrix and shape vary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    VeryEasy,
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// All presets, easiest first
    pub const ALL: [Difficulty; 5] = [
        Difficulty::VeryEasy,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::VeryEasy => "Very Easy",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let key: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        match key.as_str() {
            "veryeasy" => Some(Difficulty::VeryEasy),
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "expert" => Some(Difficulty::Expert),
            _ => None,
        }
    }

    /// Image matrix side length in cells
    pub fn grid_size(&self) -> usize {
        match self {
            Difficulty::VeryEasy => 10,
            Difficulty::Easy => 14,
            Difficulty::Medium => 18,
            Difficulty::Hard => 24,
            Difficulty::Expert => 32,
        }
    }

    pub fn detectors(&self) -> usize {
        DEFAULT_DETECTORS
    }

    /// Hidden shape family for this level
    pub fn archetype(&self) -> Archetype {
        match self {
            Difficulty::VeryEasy => Archetype::Blob,
            Difficulty::Easy => Archetype::Kidney,
            Difficulty::Medium => Archetype::Liver,
            Difficulty::Hard => Archetype::Heart,
            Difficulty::Expert => Archetype::Multi,
        }
    }

    pub fn description(&self) -> String {
        let shape = match self {
            Difficulty::VeryEasy => "Simple blob shape",
            Difficulty::Easy => "Kidney shape",
            Difficulty::Medium => "Liver shape",
            Difficulty::Hard => "Heart shape",
            Difficulty::Expert => "Multiple regions",
        };
        let n = self.grid_size();
        format!("{}, {}x{} grid", shape, n, n)
    }
}

/// Timing and layout configuration shared by the simulation components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing (ms) ===
    /// How long a detector stays lit after a hit
    pub blink_duration_ms: u64,
    /// Delay between the two blinks for a near-center event
    pub tof_min_delay_ms: u32,
    /// Delay between the two blinks for an event right next to one detector
    pub tof_max_delay_ms: u32,
    /// Time between automatic emissions
    pub emission_interval_ms: u64,
    /// How long the last LOR stays on screen before the correction phase
    pub lor_display_ms: u64,

    // === Layout (fractions of the square game area) ===
    pub ring_radius_ratio: f32,
    pub matrix_size_ratio: f32,
    /// Radial thickness of each detector arc (world units)
    pub detector_thickness: f32,

    // === Tutorial ===
    /// Compute the TOF probability zone for every emission
    pub show_probability_zone: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            blink_duration_ms: 600,
            tof_min_delay_ms: 50,
            tof_max_delay_ms: 500,
            emission_interval_ms: 2500,
            lor_display_ms: 2000,

            ring_radius_ratio: 0.42,
            matrix_size_ratio: 0.55,
            detector_thickness: 30.0,

            show_probability_zone: false,
        }
    }
}

impl SimConfig {
    /// Tutorial config: same timings, probability zone enabled
    pub fn tutorial() -> Self {
        Self {
            show_probability_zone: true,
            ..Self::default()
        }
    }

    /// Check the invariants other components rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blink_duration_ms == 0 {
            return Err(ConfigError::InvalidTiming(
                "blink duration must be positive".to_string(),
            ));
        }
        if self.tof_min_delay_ms > self.tof_max_delay_ms {
            return Err(ConfigError::InvalidTiming(format!(
                "TOF min delay {} exceeds max delay {}",
                self.tof_min_delay_ms, self.tof_max_delay_ms
            )));
        }
        let ratios = [self.ring_radius_ratio, self.matrix_size_ratio];
        if ratios.iter().any(|r| r.is_nan() || *r <= 0.0) {
            return Err(ConfigError::InvalidGeometry(
                "layout ratios must be positive".to_string(),
            ));
        }
        if self.detector_thickness < 0.0 {
            return Err(ConfigError::InvalidGeometry(
                "detector thickness cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }
}

/// Per-round inputs the host decides on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSetup {
    pub grid_size: usize,
    pub num_detectors: usize,
    pub archetype: Archetype,
    /// Shape and emission order seed; `None` picks one at random
    pub seed: Option<u64>,
}

impl RoundSetup {
    pub fn from_difficulty(difficulty: Difficulty, seed: Option<u64>) -> Self {
        Self {
            grid_size: difficulty.grid_size(),
            num_detectors: difficulty.detectors(),
            archetype: difficulty.archetype(),
            seed,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < MIN_GRID_SIZE {
            return Err(ConfigError::GridTooSmall {
                grid_size: self.grid_size,
                min: MIN_GRID_SIZE,
            });
        }
        if self.num_detectors < MIN_DETECTORS {
            return Err(ConfigError::TooFewDetectors {
                detectors: self.num_detectors,
                min: MIN_DETECTORS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_round_trip_names() {
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
        }
        assert_eq!(Difficulty::from_str("very_easy"), Some(Difficulty::VeryEasy));
        assert_eq!(Difficulty::from_str("EXPERT"), Some(Difficulty::Expert));
        assert_eq!(Difficulty::from_str("impossible"), None);
    }

    #[test]
    fn test_difficulty_table() {
        assert_eq!(Difficulty::Hard.grid_size(), 24);
        assert_eq!(Difficulty::Hard.archetype(), Archetype::Heart);
        assert_eq!(Difficulty::Expert.detectors(), 64);
        assert_eq!(Difficulty::VeryEasy.description(), "Simple blob shape, 10x10 grid");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = SimConfig::from_json(r#"{ "tof_max_delay_ms": 800 }"#).unwrap();
        assert_eq!(config.tof_max_delay_ms, 800);
        assert_eq!(config.blink_duration_ms, 600);
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let err = SimConfig::from_json(r#"{ "tof_min_delay_ms": 900 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTiming(_)));

        let err = SimConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = SimConfig::tutorial();
        let json = config.to_json().unwrap();
        assert_eq!(SimConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("guess_the_signal_missing_config.json");
        let _ = std::fs::remove_file(&path);
        assert_eq!(SimConfig::load(&path).unwrap(), SimConfig::default());
    }

    #[test]
    fn test_round_setup_validation() {
        let mut setup = RoundSetup::from_difficulty(Difficulty::Easy, Some(1));
        assert!(setup.validate().is_ok());
        setup.grid_size = 4;
        assert!(matches!(
            setup.validate(),
            Err(ConfigError::GridTooSmall { grid_size: 4, .. })
        ));
        setup.grid_size = 14;
        setup.num_detectors = 1;
        assert!(matches!(
            setup.validate(),
            Err(ConfigError::TooFewDetectors { .. })
        ));
    }
}
