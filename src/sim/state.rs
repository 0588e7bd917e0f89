//! Match state and core simulation types
//!
//! Everything one match needs lives in [`RaceState`]: the immutable track
//! (circuit, checkpoint ring, power-ups), the racers, the phase machine and
//! the race clock.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::checkpoint::CheckpointRing;
use super::circuit::Circuit;
use super::collision::{PowerUp, PowerUpId, place_power_ups};
use super::racer::{Racer, RacerId, Team};
use super::route::RoutePlanner;
use crate::settings::{MatchConfig, SetupError};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Lobby: waiting for both starting slots to be bound
    Init,
    /// Racing: movement, checkpoints and pickups all active
    Play,
    /// Clock frozen
    Pause,
    /// Race over (terminal)
    End,
}

/// Which side of the match a slot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Player,
    Opponent,
}

/// Final result of a race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    pub winner: RacerId,
    pub winner_is_human: bool,
    pub race_time_ms: u64,
}

/// Things that happened during a tick, for the scene and HUD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceEvent {
    SlotBound { side: Side, team: Team },
    Started,
    Paused,
    Resumed,
    CheckpointCrossed { racer: RacerId, index: usize },
    LapCompleted { racer: RacerId, lap: u32 },
    Snapped { racer: RacerId, sample: usize },
    CreditConsumed { racer: RacerId, remaining: u32 },
    PenaltyStarted { racer: RacerId, ms: u32 },
    PowerUpCollected { racer: RacerId, power_up: PowerUpId },
    Finished(RaceOutcome),
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct RaceState {
    config: MatchConfig,
    pub(crate) circuit: Circuit,
    pub(crate) checkpoints: CheckpointRing,
    /// Current phase
    pub phase: MatchPhase,
    player_slot: Option<Team>,
    opponent_slot: Option<Team>,
    /// Racers in id order; the human is always first once play starts
    pub racers: Vec<Racer>,
    /// Power-ups in id order; never removed
    pub power_ups: Vec<PowerUp>,
    /// Wall-clock time since play started (ms), including pauses
    pub clock_ms: u64,
    /// Total time spent paused (ms)
    pub paused_ms: u64,
    pause_started_ms: Option<u64>,
    /// Unconsumed time for the fixed-period wind driver
    pub wind_accumulator_ms: u32,
    /// Events from the most recent tick
    pub events: Vec<RaceEvent>,
    pub outcome: Option<RaceOutcome>,
}

impl RaceState {
    /// Validate the config and build the track for a new match
    pub fn new(config: MatchConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let circuit = Circuit::from_config(&config.circuit, config.sample_count)?;
        let checkpoints =
            CheckpointRing::from_circuit(&circuit, config.checkpoint_count, config.checkpoint_radius)?;
        let power_ups = place_power_ups(
            &circuit,
            config.power_up_count,
            config.min_height,
            config.max_height,
            config.seed,
        );
        log::info!(
            "Match set up: {} laps, {} checkpoints, {} power-ups, {} samples",
            config.total_laps,
            checkpoints.len(),
            power_ups.len(),
            circuit.sample_count()
        );

        Ok(Self {
            config,
            circuit,
            checkpoints,
            phase: MatchPhase::Init,
            player_slot: None,
            opponent_slot: None,
            racers: Vec::new(),
            power_ups,
            clock_ms: 0,
            paused_ms: 0,
            pause_started_ms: None,
            wind_accumulator_ms: 0,
            events: Vec::new(),
            outcome: None,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn checkpoints(&self) -> &CheckpointRing {
        &self.checkpoints
    }

    pub fn slot(&self, side: Side) -> Option<Team> {
        match side {
            Side::Player => self.player_slot,
            Side::Opponent => self.opponent_slot,
        }
    }

    /// Bind a starting slot. Only in INIT, and a team already taken by the
    /// other side is refused.
    pub fn bind_slot(&mut self, side: Side, team: Team) -> bool {
        if self.phase != MatchPhase::Init {
            return false;
        }
        let other = match side {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        };
        if self.slot(other) == Some(team) {
            log::warn!("{team:?} is already bound to {other:?}");
            return false;
        }
        match side {
            Side::Player => self.player_slot = Some(team),
            Side::Opponent => self.opponent_slot = Some(team),
        }
        self.events.push(RaceEvent::SlotBound { side, team });
        true
    }

    /// INIT -> PLAY. Builds the racers from the bound slots.
    pub fn start(&mut self) -> Result<(), SetupError> {
        if self.phase != MatchPhase::Init {
            return Ok(());
        }
        let (Some(player), Some(opponent)) = (self.player_slot, self.opponent_slot) else {
            return Err(SetupError::SlotsUnbound);
        };

        let (min_height, max_height) = (self.config.min_height, self.config.max_height);
        let start = self.circuit.point_at(0.0);
        let mut racers = vec![Racer::human(
            RacerId(0),
            player,
            Vec3::new(start.x, self.config.start_height, start.z),
            min_height,
            max_height,
        )];
        for index in 0..self.config.ai_racers {
            let route = RoutePlanner::new(
                opponent,
                self.config.routes.for_team(opponent),
                self.config.route_period_ms,
                index,
            )?;
            racers.push(Racer::ai(
                RacerId(index as u32 + 1),
                route,
                min_height,
                max_height,
            ));
        }

        self.racers = racers;
        self.phase = MatchPhase::Play;
        self.clock_ms = 0;
        self.paused_ms = 0;
        self.pause_started_ms = None;
        self.wind_accumulator_ms = 0;
        self.events.push(RaceEvent::Started);
        log::info!(
            "Race started: player {:?} vs {} {:?} AI",
            player,
            self.config.ai_racers,
            opponent
        );
        Ok(())
    }

    /// Race time: wall clock minus time spent paused. Frozen while paused.
    pub fn race_time_ms(&self) -> u64 {
        let now = self.pause_started_ms.unwrap_or(self.clock_ms);
        now.saturating_sub(self.paused_ms)
    }

    /// PLAY -> PAUSE. Stops the wind driver.
    pub fn pause(&mut self) -> bool {
        if self.phase != MatchPhase::Play {
            return false;
        }
        self.phase = MatchPhase::Pause;
        self.pause_started_ms = Some(self.clock_ms);
        self.events.push(RaceEvent::Paused);
        log::info!("Paused at race time {} ms", self.race_time_ms());
        true
    }

    /// PAUSE -> PLAY. Folds the pause into `paused_ms` and restarts the
    /// wind driver in one step so race time continues from where it froze.
    pub fn resume(&mut self) -> bool {
        if self.phase != MatchPhase::Pause {
            return false;
        }
        let started = self.pause_started_ms.take().unwrap_or(self.clock_ms);
        self.paused_ms += self.clock_ms.saturating_sub(started);
        self.wind_accumulator_ms = 0;
        self.phase = MatchPhase::Play;
        self.events.push(RaceEvent::Resumed);
        log::info!("Resumed at race time {} ms", self.race_time_ms());
        true
    }

    /// PLAY -> END with `winner`
    pub fn finish(&mut self, winner: RacerId) {
        if self.phase != MatchPhase::Play {
            return;
        }
        let winner_is_human = self
            .racers
            .iter()
            .find(|r| r.id == winner)
            .is_some_and(|r| r.is_human());
        let outcome = RaceOutcome {
            winner,
            winner_is_human,
            race_time_ms: self.race_time_ms(),
        };
        self.phase = MatchPhase::End;
        self.outcome = Some(outcome);
        self.events.push(RaceEvent::Finished(outcome));
        log::info!(
            "Race finished: winner {:?} (human: {}) in {} ms",
            winner,
            winner_is_human,
            outcome.race_time_ms
        );
    }

    pub fn human(&self) -> Option<&Racer> {
        self.racers.iter().find(|r| r.is_human())
    }

    pub fn human_mut(&mut self) -> Option<&mut Racer> {
        self.racers.iter_mut().find(|r| r.is_human())
    }

    pub fn racer(&self, id: RacerId) -> Option<&Racer> {
        self.racers.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> MatchConfig {
        MatchConfig {
            sample_count: 1000,
            ..MatchConfig::default()
        }
    }

    #[test]
    fn test_new_starts_in_init_with_track_built() {
        let state = RaceState::new(small_config()).expect("valid");
        assert_eq!(state.phase, MatchPhase::Init);
        assert_eq!(state.checkpoints().len(), 16);
        assert_eq!(state.power_ups.len(), 6);
        assert_eq!(state.circuit().sample_count(), 1000);
        assert!(state.racers.is_empty());
    }

    #[test]
    fn test_invalid_config_prevents_match() {
        let config = MatchConfig {
            checkpoint_count: 0,
            ..small_config()
        };
        assert!(matches!(
            RaceState::new(config),
            Err(SetupError::ZeroCheckpoints)
        ));
    }

    #[test]
    fn test_start_requires_both_slots() {
        let mut state = RaceState::new(small_config()).expect("valid");
        assert!(matches!(state.start(), Err(SetupError::SlotsUnbound)));
        assert!(state.bind_slot(Side::Player, Team::Red));
        assert!(matches!(state.start(), Err(SetupError::SlotsUnbound)));
        assert_eq!(state.phase, MatchPhase::Init);

        assert!(state.bind_slot(Side::Opponent, Team::Blue));
        state.start().expect("both bound");
        assert_eq!(state.phase, MatchPhase::Play);
        assert_eq!(state.racers.len(), 2);

        let human = state.human().expect("human");
        assert_eq!(human.id, RacerId(0));
        assert_eq!(human.team, Team::Red);
        assert_eq!(human.pos.y, 10.0);
        let ai = state.racer(RacerId(1)).expect("ai");
        assert_eq!(ai.team, Team::Blue);
        assert!(!ai.is_human());
    }

    #[test]
    fn test_same_team_cannot_fill_both_slots() {
        let mut state = RaceState::new(small_config()).expect("valid");
        assert!(state.bind_slot(Side::Player, Team::Blue));
        assert!(!state.bind_slot(Side::Opponent, Team::Blue));
        assert_eq!(state.slot(Side::Opponent), None);
        // Rebinding your own side is fine
        assert!(state.bind_slot(Side::Player, Team::Red));
        assert!(state.bind_slot(Side::Opponent, Team::Blue));
    }

    #[test]
    fn test_pause_and_resume_keep_race_time() {
        let mut state = RaceState::new(small_config()).expect("valid");
        // Pausing in INIT is a no-op
        assert!(!state.pause());
        state.bind_slot(Side::Player, Team::Red);
        state.bind_slot(Side::Opponent, Team::Blue);
        state.start().expect("start");

        state.clock_ms = 5_000;
        assert_eq!(state.race_time_ms(), 5_000);
        assert!(state.pause());
        assert!(!state.pause());
        state.clock_ms = 12_000;
        assert_eq!(state.race_time_ms(), 5_000);

        state.wind_accumulator_ms = 17;
        assert!(state.resume());
        assert_eq!(state.paused_ms, 7_000);
        assert_eq!(state.race_time_ms(), 5_000);
        assert_eq!(state.wind_accumulator_ms, 0);

        state.clock_ms = 13_000;
        assert_eq!(state.race_time_ms(), 6_000);
    }

    #[test]
    fn test_end_is_terminal() {
        let mut state = RaceState::new(small_config()).expect("valid");
        state.bind_slot(Side::Player, Team::Red);
        state.bind_slot(Side::Opponent, Team::Blue);
        state.start().expect("start");
        state.finish(RacerId(0));
        assert_eq!(state.phase, MatchPhase::End);
        let outcome = state.outcome.expect("outcome");
        assert!(outcome.winner_is_human);

        assert!(!state.pause());
        assert!(!state.resume());
        assert!(!state.bind_slot(Side::Player, Team::Blue));
        state.start().expect("no-op");
        state.finish(RacerId(1));
        assert_eq!(state.phase, MatchPhase::End);
        assert_eq!(state.outcome.expect("outcome").winner, RacerId(0));
    }
}
