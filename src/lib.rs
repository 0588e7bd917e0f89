//! Balloon Race - simulation core for a balloon-racing mini-game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (circuit, racers, checkpoints, pickups, match state)
//! - `settings`: Match configuration and setup validation

pub mod settings;
pub mod sim;

pub use settings::{MatchConfig, SetupError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed period of the human wind-correction driver (ms)
    pub const WIND_TICK_MS: u32 = 30;
    /// Maximum wind substeps per frame to prevent spiral of death
    pub const MAX_WIND_SUBSTEPS: u32 = 8;

    /// Tuning defaults (overridable through `MatchConfig`)
    pub const DEFAULT_SAMPLE_COUNT: usize = 10_000;
    pub const DEFAULT_SNAP_LOOKBACK: usize = 30;
    pub const DEFAULT_CHECKPOINT_COUNT: usize = 16;
    pub const DEFAULT_CHECKPOINT_RADIUS: f32 = 10.0;
    pub const DEFAULT_TRACK_THRESHOLD: f32 = 5.0;
    pub const DEFAULT_ROUTE_PERIOD_MS: u64 = 60_000;

    /// Scale feedback: bump applied on vertical input
    pub const SCALE_BUMP: f32 = 0.15;
    /// Delay after the last vertical input before the scale restores (ms)
    pub const SCALE_RESTORE_DELAY_MS: u32 = 250;
    /// Fraction of the remaining scale gap closed per millisecond
    pub const SCALE_EASE_PER_MS: f32 = 0.01;

    /// Speed multiplier increment per AI racer index
    pub const AI_SPEED_STEP: f32 = 0.25;
}

/// Distance between two points projected onto the ground (x, z) plane
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Index `offset` steps behind `index` in a ring of `len` entries
#[inline]
pub fn wrap_index(index: usize, offset: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index + len - offset % len) % len
}
