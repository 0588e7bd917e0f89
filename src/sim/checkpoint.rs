//! Checkpoint ring and lap counting
//!
//! K positions sampled once from the circuit at race start. Each racer keeps
//! its own cursor into the ring; the cursor only ever moves forward, and
//! wrapping past the last checkpoint completes a lap.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::circuit::Circuit;
use super::racer::Racer;
use crate::planar_distance;
use crate::settings::SetupError;

/// Per-racer progress through the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapProgress {
    /// Index of the next checkpoint to cross, in [0, K)
    pub checkpoint: usize,
    /// Current lap, starting at 1
    pub lap: u32,
}

impl Default for LapProgress {
    fn default() -> Self {
        Self {
            checkpoint: 0,
            lap: 1,
        }
    }
}

impl LapProgress {
    /// Laps fully completed so far
    pub fn laps_completed(&self) -> u32 {
        self.lap - 1
    }
}

/// A checkpoint crossed this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    /// Index of the checkpoint that was crossed
    pub index: usize,
    /// Lap number that was just finished, if the crossing wrapped the ring
    pub lap_completed: Option<u32>,
}

/// Fixed sequence of checkpoints around the circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRing {
    positions: Vec<Vec3>,
    radius: f32,
}

impl CheckpointRing {
    /// Sample `count` checkpoints evenly from the circuit
    pub fn from_circuit(circuit: &Circuit, count: usize, radius: f32) -> Result<Self, SetupError> {
        if count == 0 {
            return Err(SetupError::ZeroCheckpoints);
        }
        Ok(Self {
            positions: circuit.sample(count),
            radius,
        })
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Position of the racer's next checkpoint
    pub fn next_for(&self, progress: &LapProgress) -> Vec3 {
        let index = progress.checkpoint % self.positions.len().max(1);
        self.positions.get(index).copied().unwrap_or(Vec3::ZERO)
    }

    /// Advance the racer's cursor if it is within range of its next checkpoint.
    ///
    /// Crossing the last checkpoint wraps the cursor to 0, bumps the lap and
    /// forgets the last power-up so it can be collected again next lap.
    pub fn check_current_checkpoint(&self, racer: &mut Racer) -> Option<Crossing> {
        if self.positions.is_empty() {
            return None;
        }
        let target = self.next_for(&racer.progress);
        if planar_distance(racer.pos, target) > self.radius {
            return None;
        }

        let index = racer.progress.checkpoint;
        racer.progress.checkpoint += 1;

        let mut lap_completed = None;
        if racer.progress.checkpoint >= self.positions.len() {
            lap_completed = Some(racer.progress.lap);
            racer.progress.checkpoint = 0;
            racer.progress.lap += 1;
            racer.forget_power_ups();
        }

        Some(Crossing {
            index,
            lap_completed,
        })
    }
}
