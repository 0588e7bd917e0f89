//! Closed Catmull-Rom spline
//!
//! A loop through an ordered list of control points. The parameter `t` in
//! [0, 1) is split evenly across segments, one segment per control point, and
//! the last segment joins the final point back to the first.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A closed interpolating curve through its control points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedSpline {
    points: Vec<Vec3>,
}

impl ClosedSpline {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point on the curve at `t`; values outside [0, 1) wrap around the loop
    pub fn point_at(&self, t: f32) -> Vec3 {
        let n = self.points.len();
        match n {
            0 => return Vec3::ZERO,
            1 => return self.points[0],
            _ => {}
        }

        let p = t.rem_euclid(1.0) * n as f32;
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs
        let segment = (p.floor() as usize).min(n - 1);
        let weight = p - segment as f32;

        let p0 = self.points[(segment + n - 1) % n];
        let p1 = self.points[segment];
        let p2 = self.points[(segment + 1) % n];
        let p3 = self.points[(segment + 2) % n];

        catmull_rom(p0, p1, p2, p3, weight)
    }

    /// Unit tangent at `t` (finite difference along the curve)
    pub fn tangent_at(&self, t: f32) -> Vec3 {
        const DELTA: f32 = 1e-4;
        (self.point_at(t + DELTA) - self.point_at(t - DELTA)).normalize_or_zero()
    }
}

/// Uniform Catmull-Rom segment between `p1` and `p2`
#[inline]
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}
