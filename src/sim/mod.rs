//! Deterministic simulation module
//!
//! All race logic lives here. This module must stay deterministic:
//! - Fixed 30 ms wind driver only
//! - Seeded RNG only
//! - AI positions are a pure function of race time
//! - No rendering or platform dependencies

pub mod checkpoint;
pub mod circuit;
pub mod collision;
pub mod racer;
pub mod route;
pub mod spline;
pub mod state;
pub mod tick;

pub use checkpoint::{CheckpointRing, Crossing, LapProgress};
pub use circuit::{Circuit, NearestSample, TrackTransform, nearest_in};
pub use collision::{Aabb, Pickup, PowerUp, PowerUpId, Volume, place_power_ups, resolve_pickups};
pub use racer::{
    BodyPart, Heading, Racer, RacerBody, RacerId, RacerKind, ScaleFeedback, Team, WindOutcome,
    WindParams, wind_step,
};
pub use route::{RoutePlanner, speed_multiplier_for};
pub use spline::ClosedSpline;
pub use state::{MatchPhase, RaceEvent, RaceOutcome, RaceState, Side};
pub use tick::{SlotSelection, TickInput, tick};
