//! Bounding volumes and power-up pickup
//!
//! Racers carry two sub-volumes (envelope and basket). Either one touching a
//! power-up's box grants a credit, but a racer gets each power-up at most once
//! per lap: every power-up granted is remembered per racer until it completes
//! a lap.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::circuit::Circuit;
use super::racer::{Racer, RacerId};

/// Collision shape, centered on its owner's position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Volume {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl Volume {
    /// Axis-aligned bounds of this shape centered at `center`
    pub fn aabb(&self, center: Vec3) -> Aabb {
        let half = match *self {
            Volume::Box { half_extents } => half_extents.abs(),
            Volume::Sphere { radius } => Vec3::splat(radius.abs()),
        };
        Aabb {
            min: center - half,
            max: center + half,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Overlap test; touching faces count as overlap
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PowerUpId(pub u32);

/// A collectible granting one off-track forgiveness credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: PowerUpId,
    pub pos: Vec3,
    pub volume: Volume,
    /// Racer most recently granted this power-up (for highlighting)
    pub consumed_by: Option<RacerId>,
}

impl PowerUp {
    pub fn new(id: PowerUpId, pos: Vec3) -> Self {
        Self {
            id,
            pos,
            volume: Volume::Box {
                half_extents: Vec3::splat(2.0),
            },
            consumed_by: None,
        }
    }

    pub fn aabb(&self) -> Aabb {
        self.volume.aabb(self.pos)
    }
}

/// A credit granted this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pickup {
    pub racer: RacerId,
    pub power_up: PowerUpId,
}

/// Test `racer` against every power-up and grant credits.
///
/// Power-ups are visited in slice order. Any power-up already in the racer's
/// `collected_this_lap` is skipped, so sustained overlap with one or several
/// power-ups grants each of them exactly once.
pub fn resolve_pickups(racer: &mut Racer, power_ups: &mut [PowerUp]) -> Vec<Pickup> {
    let [upper, lower] = racer.body_aabbs();
    let mut granted = Vec::new();

    for power_up in power_ups.iter_mut() {
        if racer.collected_this_lap.contains(&power_up.id) {
            continue;
        }
        let bounds = power_up.aabb();
        if !upper.overlaps(&bounds) && !lower.overlaps(&bounds) {
            continue;
        }

        racer.extra_lives += 1;
        racer.collected_this_lap.push(power_up.id);
        racer.last_power_up = Some(power_up.id);
        power_up.consumed_by = Some(racer.id);
        log::debug!(
            "Racer {:?} collected power-up {:?} (credits: {})",
            racer.id,
            power_up.id,
            racer.extra_lives
        );
        granted.push(Pickup {
            racer: racer.id,
            power_up: power_up.id,
        });
    }

    granted
}

/// Scatter `count` power-ups along the circuit, deterministic for a seed.
///
/// Each lands on the centerline at a random parameter and a random altitude
/// inside the racing height range.
pub fn place_power_ups(
    circuit: &Circuit,
    count: usize,
    min_height: f32,
    max_height: f32,
    seed: u64,
) -> Vec<PowerUp> {
    let mut rng = Pcg32::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let t: f32 = rng.random_range(0.05..0.95);
            let y = if min_height < max_height {
                rng.random_range(min_height..max_height)
            } else {
                min_height
            };
            let on_track = circuit.point_at(t);
            PowerUp::new(PowerUpId(i as u32), Vec3::new(on_track.x, y, on_track.z))
        })
        .collect()
}
