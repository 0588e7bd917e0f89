//! Racers: the human balloon and AI opponents
//!
//! A balloon cannot steer. Its altitude picks one of four contiguous bands
//! between `min_height` and `max_height`, and each band blows the balloon in a
//! fixed cardinal direction. The only control is going up or down.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::checkpoint::LapProgress;
use super::circuit::Circuit;
use super::collision::{Aabb, PowerUpId, Volume};
use super::route::RoutePlanner;
use crate::consts::*;
use crate::settings::MatchConfig;
use crate::wrap_index;

/// Stable racer identity (index order is iteration order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RacerId(pub u32);

/// Team tag; selects the AI waypoint list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

/// Wind direction for an altitude band, lowest band first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heading {
    Forward,
    Backward,
    Right,
    Left,
}

impl Heading {
    pub const ALL: [Heading; 4] = [
        Heading::Forward,
        Heading::Backward,
        Heading::Right,
        Heading::Left,
    ];

    /// Unit step in the ground plane
    pub fn direction(self) -> Vec3 {
        match self {
            Heading::Forward => Vec3::NEG_Z,
            Heading::Backward => Vec3::Z,
            Heading::Right => Vec3::X,
            Heading::Left => Vec3::NEG_X,
        }
    }

    fn band(self) -> usize {
        match self {
            Heading::Forward => 0,
            Heading::Backward => 1,
            Heading::Right => 2,
            Heading::Left => 3,
        }
    }

    /// Heading for an altitude; values outside the range clamp to the end bands
    pub fn from_altitude(y: f32, min_height: f32, max_height: f32) -> Self {
        let span = max_height - min_height;
        if span <= 0.0 {
            return Heading::Forward;
        }
        let band = ((y - min_height) / span * 4.0).floor().clamp(0.0, 3.0) as usize;
        Self::ALL[band]
    }

    /// Altitude at the middle of this heading's band
    pub fn band_center(self, min_height: f32, max_height: f32) -> f32 {
        let band_height = (max_height - min_height) / 4.0;
        min_height + band_height * (self.band() as f32 + 0.5)
    }
}

/// Player-controlled or route-driven
#[derive(Debug, Clone)]
pub enum RacerKind {
    Human,
    Ai(RoutePlanner),
}

/// Transient inflate/deflate feedback on vertical input. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFeedback {
    pub current: f32,
    pub target: f32,
    /// Time left before the target snaps back to 1 (None = no restore pending)
    pub restore_in_ms: Option<u32>,
}

impl Default for ScaleFeedback {
    fn default() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            restore_in_ms: None,
        }
    }
}

impl ScaleFeedback {
    /// Push the target away from 1 and restart the restore timer
    pub fn bump(&mut self, sign: f32) {
        self.target = 1.0 + sign.signum() * SCALE_BUMP;
        self.restore_in_ms = Some(SCALE_RESTORE_DELAY_MS);
    }

    /// Run the restore timer and ease `current` toward `target`
    pub fn update(&mut self, dt_ms: u32) {
        if let Some(remaining) = self.restore_in_ms {
            let remaining = remaining.saturating_sub(dt_ms);
            if remaining == 0 {
                self.target = 1.0;
                self.restore_in_ms = None;
            } else {
                self.restore_in_ms = Some(remaining);
            }
        }
        let blend = (dt_ms as f32 * SCALE_EASE_PER_MS).min(1.0);
        self.current += (self.target - self.current) * blend;
        if (self.target - self.current).abs() < 1e-4 {
            self.current = self.target;
        }
    }
}

/// One collision sub-volume, offset from the racer position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    pub offset: Vec3,
    pub volume: Volume,
}

/// Upper (envelope) and lower (basket) collision groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RacerBody {
    pub upper: BodyPart,
    pub lower: BodyPart,
}

impl Default for RacerBody {
    fn default() -> Self {
        Self {
            upper: BodyPart {
                offset: Vec3::new(0.0, 7.0, 0.0),
                volume: Volume::Sphere { radius: 5.0 },
            },
            lower: BodyPart {
                offset: Vec3::ZERO,
                volume: Volume::Box {
                    half_extents: Vec3::splat(1.5),
                },
            },
        }
    }
}

/// A balloon in the race
#[derive(Debug, Clone)]
pub struct Racer {
    pub id: RacerId,
    pub kind: RacerKind,
    pub team: Team,
    /// Basket position; y is altitude
    pub pos: Vec3,
    pub heading: Heading,
    pub min_height: f32,
    pub max_height: f32,
    pub scale: ScaleFeedback,
    /// Off-track forgiveness credits from power-ups
    pub extra_lives: u32,
    /// Time left in the current penalty window
    pub penalty_remaining_ms: u32,
    pub progress: LapProgress,
    /// Most recent power-up granted to this racer, for highlighting
    pub last_power_up: Option<PowerUpId>,
    /// Power-ups granted on the current lap; none of these can be granted again
    /// until the next lap starts
    pub collected_this_lap: Vec<PowerUpId>,
    pub body: RacerBody,
}

impl Racer {
    fn with_kind(
        id: RacerId,
        kind: RacerKind,
        team: Team,
        pos: Vec3,
        min_height: f32,
        max_height: f32,
    ) -> Self {
        Self {
            id,
            kind,
            team,
            pos,
            heading: Heading::from_altitude(pos.y, min_height, max_height),
            min_height,
            max_height,
            scale: ScaleFeedback::default(),
            extra_lives: 0,
            penalty_remaining_ms: 0,
            progress: LapProgress::default(),
            last_power_up: None,
            collected_this_lap: Vec::new(),
            body: RacerBody::default(),
        }
    }

    pub fn human(id: RacerId, team: Team, pos: Vec3, min_height: f32, max_height: f32) -> Self {
        Self::with_kind(id, RacerKind::Human, team, pos, min_height, max_height)
    }

    /// AI racer placed at the start of its route
    pub fn ai(id: RacerId, route: RoutePlanner, min_height: f32, max_height: f32) -> Self {
        let team = route.team();
        let pos = route.position_at(0);
        Self::with_kind(id, RacerKind::Ai(route), team, pos, min_height, max_height)
    }

    pub fn is_human(&self) -> bool {
        matches!(self.kind, RacerKind::Human)
    }

    pub fn route(&self) -> Option<&RoutePlanner> {
        match &self.kind {
            RacerKind::Human => None,
            RacerKind::Ai(route) => Some(route),
        }
    }

    /// A new lap makes every power-up collectable again
    pub fn forget_power_ups(&mut self) {
        self.collected_this_lap.clear();
        self.last_power_up = None;
    }

    pub fn in_penalty(&self) -> bool {
        self.penalty_remaining_ms > 0
    }

    /// Climb one step. Refused when the step would reach `max_height`.
    pub fn move_up(&mut self, step: f32) -> bool {
        self.scale.bump(1.0);
        if self.pos.y + step >= self.max_height {
            return false;
        }
        self.pos.y += step;
        self.update_heading();
        true
    }

    /// Descend one step. Refused when the step would go below `min_height`.
    pub fn move_down(&mut self, step: f32) -> bool {
        self.scale.bump(-1.0);
        if self.pos.y - step < self.min_height {
            return false;
        }
        self.pos.y -= step;
        self.update_heading();
        true
    }

    pub fn update_heading(&mut self) {
        self.heading = Heading::from_altitude(self.pos.y, self.min_height, self.max_height);
    }

    /// Place an AI racer on its route at the given race time
    pub fn follow_route(&mut self, race_time_ms: u64) {
        if let RacerKind::Ai(route) = &self.kind {
            self.pos = route.position_at(race_time_ms);
            self.update_heading();
        }
    }

    /// World-space boxes of the upper and lower body groups
    pub fn body_aabbs(&self) -> [Aabb; 2] {
        [
            self.body.upper.volume.aabb(self.pos + self.body.upper.offset),
            self.body.lower.volume.aabb(self.pos + self.body.lower.offset),
        ]
    }
}

/// Wind-correction tuning for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindParams {
    pub threshold: f32,
    pub lookback: usize,
    pub penalty_ms: u32,
    pub wind_step: f32,
}

impl WindParams {
    pub fn from_config(config: &MatchConfig) -> Self {
        Self {
            threshold: config.track_threshold,
            lookback: config.snap_lookback,
            penalty_ms: config.penalty_ms(),
            wind_step: config.wind_step,
        }
    }
}

/// What a wind step did to the racer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindOutcome {
    /// Serving a penalty; no movement
    Penalized { remaining_ms: u32 },
    /// Pulled back onto the track at `sample`
    Snapped { sample: usize, credit_used: bool },
    /// Blown one step in `heading`
    Drifted(Heading),
    /// No circuit samples to compare against; position unchanged
    NoTrack,
}

/// One fixed-period wind-correction step for a racer.
///
/// A racer that strays past the threshold is snapped `lookback` samples behind
/// its nearest sample (never onto the nearest sample itself) at its current
/// altitude, and pays with a credit or a penalty window.
pub fn wind_step(
    racer: &mut Racer,
    circuit: &Circuit,
    params: &WindParams,
    dt_ms: u32,
) -> WindOutcome {
    if racer.penalty_remaining_ms > 0 {
        racer.penalty_remaining_ms = racer.penalty_remaining_ms.saturating_sub(dt_ms);
        return WindOutcome::Penalized {
            remaining_ms: racer.penalty_remaining_ms,
        };
    }

    let Some(nearest) = circuit.nearest_sample(racer.pos) else {
        log::warn!(
            "Racer {:?}: circuit has no samples, leaving position unchanged",
            racer.id
        );
        return WindOutcome::NoTrack;
    };

    if nearest.distance >= params.threshold {
        let sample = wrap_index(nearest.index, params.lookback, circuit.sample_count());
        let target = circuit.samples()[sample];
        racer.pos = Vec3::new(target.x, racer.pos.y, target.z);

        let credit_used = if racer.extra_lives > 0 {
            racer.extra_lives -= 1;
            true
        } else {
            racer.penalty_remaining_ms = params.penalty_ms;
            false
        };
        log::debug!(
            "Racer {:?} off track by {:.2}, snapped to sample {} (credit used: {})",
            racer.id,
            nearest.distance,
            sample,
            credit_used
        );
        return WindOutcome::Snapped {
            sample,
            credit_used,
        };
    }

    racer.update_heading();
    racer.pos += racer.heading.direction() * params.wind_step;
    WindOutcome::Drifted(racer.heading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planar_distance;
    use crate::sim::circuit::tests::{square_circuit, square_points};
    use crate::sim::circuit::TrackTransform;
    use proptest::prelude::*;

    fn params() -> WindParams {
        WindParams {
            threshold: 5.0,
            lookback: 30,
            penalty_ms: 3000,
            wind_step: 0.5,
        }
    }

    fn racer_at(pos: Vec3) -> Racer {
        Racer::human(RacerId(0), Team::Red, pos, 10.0, 50.0)
    }

    #[test]
    fn test_heading_bands() {
        assert_eq!(Heading::from_altitude(10.0, 10.0, 50.0), Heading::Forward);
        assert_eq!(Heading::from_altitude(19.9, 10.0, 50.0), Heading::Forward);
        assert_eq!(Heading::from_altitude(20.0, 10.0, 50.0), Heading::Backward);
        assert_eq!(Heading::from_altitude(35.0, 10.0, 50.0), Heading::Right);
        assert_eq!(Heading::from_altitude(45.0, 10.0, 50.0), Heading::Left);
        // Out of range clamps to the end bands
        assert_eq!(Heading::from_altitude(0.0, 10.0, 50.0), Heading::Forward);
        assert_eq!(Heading::from_altitude(80.0, 10.0, 50.0), Heading::Left);
    }

    #[test]
    fn test_band_center_maps_back_to_heading() {
        for heading in Heading::ALL {
            let y = heading.band_center(10.0, 50.0);
            assert_eq!(Heading::from_altitude(y, 10.0, 50.0), heading);
        }
    }

    #[test]
    fn test_move_up_down_clamped_before_bounds() {
        let mut r = racer_at(Vec3::new(0.0, 48.5, 0.0));
        assert!(r.move_up(1.0));
        assert!((r.pos.y - 49.5).abs() < 1e-5);
        // 49.5 + 1 would exceed max
        assert!(!r.move_up(1.0));
        assert!((r.pos.y - 49.5).abs() < 1e-5);

        let mut r = racer_at(Vec3::new(0.0, 10.5, 0.0));
        // 10.5 - 1 would go below min
        assert!(!r.move_down(1.0));
        assert_eq!(r.pos.y, 10.5);

        // Landing exactly on min is allowed
        let mut r = racer_at(Vec3::new(0.0, 11.0, 0.0));
        assert!(r.move_down(1.0));
        assert_eq!(r.pos.y, 10.0);
        assert!(!r.move_down(1.0));
    }

    #[test]
    fn test_move_changes_heading() {
        let mut r = racer_at(Vec3::new(0.0, 19.5, 0.0));
        assert_eq!(r.heading, Heading::Forward);
        r.move_up(1.0);
        assert_eq!(r.heading, Heading::Backward);
    }

    #[test]
    fn test_scale_feedback_bumps_and_restores() {
        let mut r = racer_at(Vec3::new(0.0, 30.0, 0.0));
        r.move_up(1.0);
        assert!((r.scale.target - (1.0 + SCALE_BUMP)).abs() < 1e-6);
        assert_eq!(r.scale.restore_in_ms, Some(SCALE_RESTORE_DELAY_MS));

        r.scale.update(100);
        assert!(r.scale.current > 1.0);
        // New input restarts the restore timer
        r.move_down(1.0);
        assert_eq!(r.scale.restore_in_ms, Some(SCALE_RESTORE_DELAY_MS));
        assert!(r.scale.target < 1.0);

        for _ in 0..100 {
            r.scale.update(30);
        }
        assert_eq!(r.scale.target, 1.0);
        assert_eq!(r.scale.restore_in_ms, None);
        assert!((r.scale.current - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_scale_bumps_even_when_clamped() {
        let mut r = racer_at(Vec3::new(0.0, 49.5, 0.0));
        r.scale.restore_in_ms = Some(10);
        assert!(!r.move_up(1.0));
        assert_eq!(r.scale.restore_in_ms, Some(SCALE_RESTORE_DELAY_MS));
    }

    #[test]
    fn test_on_track_drifts_by_heading() {
        let circuit = square_circuit();
        // On the bottom edge, low band blows forward (-z)
        let mut r = racer_at(Vec3::new(0.0, 12.0, -50.0));
        let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
        assert_eq!(outcome, WindOutcome::Drifted(Heading::Forward));
        assert!((r.pos.z - (-50.5)).abs() < 1e-5);
        assert_eq!(r.pos.x, 0.0);
        assert_eq!(r.pos.y, 12.0);

        // Right band blows +x
        let mut r = racer_at(Vec3::new(0.0, 35.0, -50.0));
        assert_eq!(
            wind_step(&mut r, &circuit, &params(), WIND_TICK_MS),
            WindOutcome::Drifted(Heading::Right)
        );
        assert!((r.pos.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_off_track_penalty_scenario() {
        let circuit = square_circuit();
        // 6 units outside the bottom edge, no credits, 3 s penalty
        let mut r = racer_at(Vec3::new(0.0, 12.0, -56.0));
        let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
        assert!(matches!(
            outcome,
            WindOutcome::Snapped {
                credit_used: false,
                ..
            }
        ));
        assert_eq!(r.penalty_remaining_ms, 3000);

        let held = r.pos;
        for tick in 1..=100 {
            let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
            assert!(matches!(outcome, WindOutcome::Penalized { .. }), "tick {tick}");
            assert_eq!(r.pos, held);
        }
        assert_eq!(r.penalty_remaining_ms, 0);

        // Penalty over: moves again
        let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
        assert!(matches!(outcome, WindOutcome::Drifted(_)));
        assert_ne!(r.pos, held);
    }

    #[test]
    fn test_off_track_consumes_credit_instead_of_penalty() {
        let circuit = square_circuit();
        let mut r = racer_at(Vec3::new(0.0, 12.0, -70.0));
        r.extra_lives = 2;
        let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
        assert!(matches!(
            outcome,
            WindOutcome::Snapped {
                credit_used: true,
                ..
            }
        ));
        assert_eq!(r.extra_lives, 1);
        assert_eq!(r.penalty_remaining_ms, 0);
    }

    #[test]
    fn test_snap_looks_back_and_keeps_altitude() {
        let circuit = square_circuit();
        let start = Vec3::new(0.0, 33.0, -60.0);
        let nearest = circuit.nearest_sample(start).expect("samples");
        let mut r = racer_at(start);

        let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
        let expected = wrap_index(nearest.index, 30, circuit.sample_count());
        assert_eq!(
            outcome,
            WindOutcome::Snapped {
                sample: expected,
                credit_used: false
            }
        );
        assert_ne!(expected, nearest.index);
        let target = circuit.samples()[expected];
        assert_eq!(r.pos, Vec3::new(target.x, 33.0, target.z));
        // Now on track
        assert!(circuit.distance_to_track(r.pos).expect("samples") < 5.0);
    }

    #[test]
    fn test_snap_wraps_near_start_of_loop() {
        let circuit = square_circuit();
        // Just outside the first sample; 30 back wraps to the end of the loop
        let mut r = racer_at(Vec3::new(-50.0, 12.0, -60.0));
        let nearest = circuit.nearest_sample(r.pos).expect("samples");
        assert!(nearest.index < 30 || nearest.index > 3900);
        let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
        match outcome {
            WindOutcome::Snapped { sample, .. } => {
                assert_eq!(sample, wrap_index(nearest.index, 30, 4000));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_circuit_leaves_position() {
        let circuit =
            Circuit::new(square_points(50.0, 10.0), TrackTransform::default(), 0).expect("valid");
        let mut r = racer_at(Vec3::new(500.0, 12.0, 500.0));
        assert_eq!(
            wind_step(&mut r, &circuit, &params(), WIND_TICK_MS),
            WindOutcome::NoTrack
        );
        assert_eq!(r.pos, Vec3::new(500.0, 12.0, 500.0));
        assert_eq!(r.penalty_remaining_ms, 0);
    }

    #[test]
    fn test_body_aabbs_follow_position() {
        let r = racer_at(Vec3::new(10.0, 20.0, 30.0));
        let [upper, lower] = r.body_aabbs();
        assert_eq!(lower.min, Vec3::new(8.5, 18.5, 28.5));
        assert_eq!(upper.max, Vec3::new(15.0, 32.0, 35.0));
    }

    proptest! {
        #[test]
        fn prop_up_then_down_restores_altitude(y in 12.0f32..47.0, step in 0.1f32..2.0) {
            let mut r = racer_at(Vec3::new(0.0, y, 0.0));
            prop_assert!(r.move_up(step));
            prop_assert!(r.move_down(step));
            prop_assert!((r.pos.y - y).abs() < 1e-4);
            prop_assert_eq!(r.heading, Heading::from_altitude(r.pos.y, 10.0, 50.0));
        }

        #[test]
        fn prop_snap_lands_on_track(x in -120.0f32..120.0, z in -120.0f32..120.0) {
            let circuit = square_circuit();
            let mut r = racer_at(Vec3::new(x, 12.0, z));
            let before = circuit.distance_to_track(r.pos).expect("samples");
            let outcome = wind_step(&mut r, &circuit, &params(), WIND_TICK_MS);
            if before >= 5.0 {
                let is_snap = matches!(outcome, WindOutcome::Snapped { .. });
                prop_assert!(is_snap);
                prop_assert!(circuit.distance_to_track(r.pos).expect("samples") < 5.0);
                prop_assert!(planar_distance(r.pos, circuit.nearest_sample(r.pos).expect("samples").point) < 1e-3);
            } else {
                let is_drift = matches!(outcome, WindOutcome::Drifted(_));
                prop_assert!(is_drift);
            }
        }
    }
}
