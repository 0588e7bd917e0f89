//! The closed race circuit
//!
//! Owns the centerline spline plus its world transform and a cached, evenly
//! spaced sample set used for proximity queries. The cache is rebuilt whenever
//! the transform changes so distance queries never run against stale samples.
//!
//! Nearest-sample search is a brute-force O(n) scan. At n = 10 000 and a
//! ~33 Hz driver this is cheap enough; a grid or k-d index over the samples
//! could replace it as long as ties still resolve to the lowest sample index.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::spline::ClosedSpline;
use crate::planar_distance;
use crate::settings::{CircuitConfig, MIN_LOOP_POINTS, SetupError};

/// Uniform scale and vertical offset applied to every sampled point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackTransform {
    pub scale: f32,
    pub y_offset: f32,
}

impl Default for TrackTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            y_offset: 0.0,
        }
    }
}

impl TrackTransform {
    #[inline]
    pub fn apply(&self, p: Vec3) -> Vec3 {
        p * self.scale + Vec3::Y * self.y_offset
    }
}

/// Result of a nearest-sample query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestSample {
    pub index: usize,
    pub point: Vec3,
    /// Planar (x, z) distance from the query position
    pub distance: f32,
}

/// Closed centerline curve of the track
#[derive(Debug, Clone)]
pub struct Circuit {
    spline: ClosedSpline,
    transform: TrackTransform,
    samples: Vec<Vec3>,
}

impl Circuit {
    /// Build a circuit and cache `sample_count` samples for proximity search
    pub fn new(
        control_points: Vec<Vec3>,
        transform: TrackTransform,
        sample_count: usize,
    ) -> Result<Self, SetupError> {
        if control_points.len() < MIN_LOOP_POINTS {
            return Err(SetupError::CircuitTooShort {
                count: control_points.len(),
            });
        }
        let mut circuit = Self {
            spline: ClosedSpline::new(control_points),
            transform,
            samples: Vec::new(),
        };
        circuit.samples = circuit.sample(sample_count);
        Ok(circuit)
    }

    pub fn from_config(config: &CircuitConfig, sample_count: usize) -> Result<Self, SetupError> {
        Self::new(
            config.control_points.clone(),
            TrackTransform {
                scale: config.scale,
                y_offset: config.y_offset,
            },
            sample_count,
        )
    }

    pub fn transform(&self) -> TrackTransform {
        self.transform
    }

    /// Change the world transform; the sample cache is rebuilt to match
    pub fn set_transform(&mut self, transform: TrackTransform) {
        if transform == self.transform {
            return;
        }
        self.transform = transform;
        self.samples = self.sample(self.samples.len());
    }

    /// Transformed point at parameter `t` in [0, 1)
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.transform.apply(self.spline.point_at(t))
    }

    /// Direction of travel at `t`. Scale and offset do not change it.
    pub fn tangent_at(&self, t: f32) -> Vec3 {
        self.spline.tangent_at(t)
    }

    /// `n` evenly spaced transformed points over t in [0, 1)
    pub fn sample(&self, n: usize) -> Vec<Vec3> {
        (0..n).map(|i| self.point_at(i as f32 / n as f32)).collect()
    }

    /// Cached sample set in the current transform
    pub fn samples(&self) -> &[Vec3] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Nearest cached sample to `position` in the ground plane
    pub fn nearest_sample(&self, position: Vec3) -> Option<NearestSample> {
        nearest_in(&self.samples, position)
    }

    /// Planar distance from `position` to the nearest cached sample
    pub fn distance_to_track(&self, position: Vec3) -> Option<f32> {
        self.nearest_sample(position).map(|n| n.distance)
    }
}

/// Brute-force nearest point in `samples`; ties keep the first minimum
pub fn nearest_in(samples: &[Vec3], position: Vec3) -> Option<NearestSample> {
    let mut best: Option<NearestSample> = None;
    for (index, &point) in samples.iter().enumerate() {
        let distance = planar_distance(point, position);
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(NearestSample {
                index,
                point,
                distance,
            });
        }
    }
    best
}
