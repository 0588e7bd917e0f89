//! Match configuration
//!
//! Supplied once at match setup and treated as immutable for the match's
//! duration. Loaded from JSON; every field has a default so partial files work.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::Team;

/// Fewest control points that still describe a closed loop
pub const MIN_LOOP_POINTS: usize = 3;

/// Fatal configuration/setup errors. Any of these prevents INIT -> PLAY.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("circuit needs at least {min} control points, got {count}", min = MIN_LOOP_POINTS)]
    CircuitTooShort { count: usize },
    #[error("{team:?} route needs at least {min} waypoints, got {count}", min = MIN_LOOP_POINTS)]
    RouteTooShort { team: Team, count: usize },
    #[error("checkpoint ring must have at least one checkpoint")]
    ZeroCheckpoints,
    #[error("total laps must be at least 1")]
    ZeroLaps,
    #[error("invalid height range: min {min} must be below max {max}")]
    InvalidHeightRange { min: f32, max: f32 },
    #[error("start height {height} outside [{min}, {max}]")]
    StartHeightOutOfRange { height: f32, min: f32, max: f32 },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("both player and opponent slots must be bound before play")]
    SlotsUnbound,
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Closed centerline of the circuit and its world transform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Control points of the closed curve (untransformed)
    pub control_points: Vec<Vec3>,
    /// Uniform scale applied to every sampled point
    pub scale: f32,
    /// Vertical offset applied after scaling
    pub y_offset: f32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            control_points: vec![
                Vec3::new(120.0, 0.0, 0.0),
                Vec3::new(103.9, 0.0, 40.0),
                Vec3::new(60.0, 0.0, 69.3),
                Vec3::new(0.0, 0.0, 80.0),
                Vec3::new(-60.0, 0.0, 69.3),
                Vec3::new(-103.9, 0.0, 40.0),
                Vec3::new(-120.0, 0.0, 0.0),
                Vec3::new(-103.9, 0.0, -40.0),
                Vec3::new(-60.0, 0.0, -69.3),
                Vec3::new(0.0, 0.0, -80.0),
                Vec3::new(60.0, 0.0, -69.3),
                Vec3::new(103.9, 0.0, -40.0),
            ],
            scale: 1.0,
            y_offset: 0.0,
        }
    }
}

/// Fixed AI waypoint lists, one closed loop per team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRoutes {
    pub red: Vec<Vec3>,
    pub blue: Vec<Vec3>,
}

impl TeamRoutes {
    pub fn for_team(&self, team: Team) -> &[Vec3] {
        match team {
            Team::Red => &self.red,
            Team::Blue => &self.blue,
        }
    }
}

impl Default for TeamRoutes {
    fn default() -> Self {
        Self {
            // Inside lane, low
            red: vec![
                Vec3::new(114.0, 25.0, 0.0),
                Vec3::new(98.7, 25.0, 38.0),
                Vec3::new(57.0, 25.0, 65.8),
                Vec3::new(0.0, 25.0, 76.0),
                Vec3::new(-57.0, 25.0, 65.8),
                Vec3::new(-98.7, 25.0, 38.0),
                Vec3::new(-114.0, 25.0, 0.0),
                Vec3::new(-98.7, 25.0, -38.0),
                Vec3::new(-57.0, 25.0, -65.8),
                Vec3::new(0.0, 25.0, -76.0),
                Vec3::new(57.0, 25.0, -65.8),
                Vec3::new(98.7, 25.0, -38.0),
            ],
            // Outside lane, high
            blue: vec![
                Vec3::new(126.0, 35.0, 0.0),
                Vec3::new(109.1, 35.0, 42.0),
                Vec3::new(63.0, 35.0, 72.7),
                Vec3::new(0.0, 35.0, 84.0),
                Vec3::new(-63.0, 35.0, 72.7),
                Vec3::new(-109.1, 35.0, 42.0),
                Vec3::new(-126.0, 35.0, 0.0),
                Vec3::new(-109.1, 35.0, -42.0),
                Vec3::new(-63.0, 35.0, -72.7),
                Vec3::new(0.0, 35.0, -84.0),
                Vec3::new(63.0, 35.0, -72.7),
                Vec3::new(109.1, 35.0, -42.0),
            ],
        }
    }
}

/// Complete match configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    // === Race rules ===
    pub total_laps: u32,
    pub penalty_seconds: u32,

    // === Track ===
    pub circuit: CircuitConfig,
    /// Samples used for nearest-point search
    pub sample_count: usize,
    /// Planar distance at which a racer counts as off track
    pub track_threshold: f32,
    /// Samples to step back from the nearest one when snapping
    pub snap_lookback: usize,
    pub checkpoint_count: usize,
    pub checkpoint_radius: f32,

    // === Racer movement ===
    pub min_height: f32,
    pub max_height: f32,
    pub start_height: f32,
    /// Altitude change per vertical input
    pub altitude_step: f32,
    /// Horizontal drift per wind tick
    pub wind_step: f32,

    // === AI ===
    pub routes: TeamRoutes,
    pub route_period_ms: u64,
    pub ai_racers: usize,

    // === Power-ups ===
    pub power_up_count: usize,
    /// Seed for power-up placement
    pub seed: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            total_laps: 3,
            penalty_seconds: 3,

            circuit: CircuitConfig::default(),
            sample_count: DEFAULT_SAMPLE_COUNT,
            track_threshold: DEFAULT_TRACK_THRESHOLD,
            snap_lookback: DEFAULT_SNAP_LOOKBACK,
            checkpoint_count: DEFAULT_CHECKPOINT_COUNT,
            checkpoint_radius: DEFAULT_CHECKPOINT_RADIUS,

            min_height: 10.0,
            max_height: 50.0,
            start_height: 10.0,
            altitude_step: 1.0,
            wind_step: 0.5,

            routes: TeamRoutes::default(),
            route_period_ms: DEFAULT_ROUTE_PERIOD_MS,
            ai_racers: 1,

            power_up_count: 6,
            seed: 0x0ba1_100e,
        }
    }
}

impl MatchConfig {
    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded match config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Penalty window in milliseconds
    pub fn penalty_ms(&self) -> u32 {
        self.penalty_seconds.saturating_mul(1000)
    }

    /// Check everything that must hold before a match can be built
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.total_laps == 0 {
            return Err(SetupError::ZeroLaps);
        }
        if self.checkpoint_count == 0 {
            return Err(SetupError::ZeroCheckpoints);
        }
        let count = self.circuit.control_points.len();
        if count < MIN_LOOP_POINTS {
            return Err(SetupError::CircuitTooShort { count });
        }
        for team in [Team::Red, Team::Blue] {
            let count = self.routes.for_team(team).len();
            if count < MIN_LOOP_POINTS {
                return Err(SetupError::RouteTooShort { team, count });
            }
        }
        if self.min_height >= self.max_height {
            return Err(SetupError::InvalidHeightRange {
                min: self.min_height,
                max: self.max_height,
            });
        }
        if self.start_height < self.min_height || self.start_height > self.max_height {
            return Err(SetupError::StartHeightOutOfRange {
                height: self.start_height,
                min: self.min_height,
                max: self.max_height,
            });
        }

        let positive = [
            ("circuit.scale", self.circuit.scale),
            ("track_threshold", self.track_threshold),
            ("checkpoint_radius", self.checkpoint_radius),
            ("altitude_step", self.altitude_step),
            ("wind_step", self.wind_step),
            ("route_period_ms", self.route_period_ms as f32),
        ];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(SetupError::NonPositive { field, value });
            }
        }

        if self.sample_count == 0 {
            log::warn!("sample_count is 0: off-track correction is disabled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.penalty_ms(), 3000);
        assert_eq!(config.checkpoint_count, 16);
        assert_eq!(config.snap_lookback, 30);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = MatchConfig::from_json(r#"{ "total_laps": 5, "penalty_seconds": 0 }"#)
            .expect("valid json");
        assert_eq!(config.total_laps, 5);
        assert_eq!(config.penalty_seconds, 0);
        assert_eq!(config.sample_count, DEFAULT_SAMPLE_COUNT);
        assert_eq!(config.routes.red.len(), 12);
    }

    #[test]
    fn test_waypoints_parse_as_arrays() {
        let json = r#"{ "routes": { "red": [[0,0,0],[10,0,0],[10,0,10]], "blue": [] } }"#;
        let config = MatchConfig::from_json(json).expect("valid json");
        assert_eq!(config.routes.red[1], Vec3::new(10.0, 0.0, 0.0));
        assert!(matches!(
            config.validate(),
            Err(SetupError::RouteTooShort { team: Team::Blue, count: 0 })
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            MatchConfig::from_json("{ total_laps: }"),
            Err(SetupError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = MatchConfig::default();
        config.total_laps = 0;
        assert!(matches!(config.validate(), Err(SetupError::ZeroLaps)));

        let mut config = MatchConfig::default();
        config.checkpoint_count = 0;
        assert!(matches!(config.validate(), Err(SetupError::ZeroCheckpoints)));

        let mut config = MatchConfig::default();
        config.circuit.control_points.truncate(2);
        assert!(matches!(
            config.validate(),
            Err(SetupError::CircuitTooShort { count: 2 })
        ));

        let mut config = MatchConfig::default();
        config.min_height = 60.0;
        assert!(matches!(
            config.validate(),
            Err(SetupError::InvalidHeightRange { .. })
        ));

        let mut config = MatchConfig::default();
        config.wind_step = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SetupError::NonPositive { field: "wind_step", .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            MatchConfig::load("/nonexistent/balloon-race.json"),
            Err(SetupError::Io(_))
        ));
    }
}
