//! AI route planning
//!
//! An AI racer's position is a pure function of race time: the team's
//! waypoints become a closed spline once, and the spline parameter is the race
//! time modulo the racer's effective period. Nothing is integrated, so a
//! paused and resumed race picks up exactly where it left off.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::racer::Team;
use super::spline::ClosedSpline;
use crate::consts::AI_SPEED_STEP;
use crate::settings::{MIN_LOOP_POINTS, SetupError};

/// Speed multiplier for the AI racer at `index`. Larger means a longer lap.
pub fn speed_multiplier_for(index: usize) -> f32 {
    1.0 + index as f32 * AI_SPEED_STEP
}

/// Time-parameterized route through a team's waypoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlanner {
    team: Team,
    spline: ClosedSpline,
    period_ms: u64,
    speed_multiplier: f32,
}

impl RoutePlanner {
    /// Route for the AI racer at `index` on `team`
    pub fn new(
        team: Team,
        waypoints: &[Vec3],
        period_ms: u64,
        index: usize,
    ) -> Result<Self, SetupError> {
        Self::with_multiplier(team, waypoints, period_ms, speed_multiplier_for(index))
    }

    pub fn with_multiplier(
        team: Team,
        waypoints: &[Vec3],
        period_ms: u64,
        speed_multiplier: f32,
    ) -> Result<Self, SetupError> {
        if waypoints.len() < MIN_LOOP_POINTS {
            return Err(SetupError::RouteTooShort {
                team,
                count: waypoints.len(),
            });
        }
        if period_ms == 0 {
            return Err(SetupError::NonPositive {
                field: "route_period_ms",
                value: 0.0,
            });
        }
        if speed_multiplier.is_nan() || speed_multiplier <= 0.0 {
            return Err(SetupError::NonPositive {
                field: "speed_multiplier",
                value: speed_multiplier,
            });
        }
        Ok(Self {
            team,
            spline: ClosedSpline::new(waypoints.to_vec()),
            period_ms,
            speed_multiplier,
        })
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Duration of one lap for this racer
    pub fn effective_period_ms(&self) -> f64 {
        self.period_ms as f64 * self.speed_multiplier as f64
    }

    /// Spline parameter in [0, 1) at a race time
    pub fn phase_at(&self, race_time_ms: u64) -> f32 {
        let period = self.effective_period_ms();
        let phase = (race_time_ms as f64 % period) / period;
        // Rounding can land exactly on 1.0
        (phase as f32).min(1.0 - f32::EPSILON)
    }

    pub fn position_at(&self, race_time_ms: u64) -> Vec3 {
        self.spline.point_at(self.phase_at(race_time_ms))
    }

    /// Full laps finished by a race time
    pub fn laps_completed(&self, race_time_ms: u64) -> u32 {
        (race_time_ms as f64 / self.effective_period_ms()).floor() as u32
    }
}
