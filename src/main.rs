//! Balloon Race entry point
//!
//! Runs a headless demo match: the human balloon is flown by the idle-mode
//! autopilot against the AI opponents until the race ends.

use std::process::ExitCode;

use balloon_race::MatchConfig;
use balloon_race::sim::{MatchPhase, RaceEvent, RaceState, Side, SlotSelection, Team, TickInput, tick};

/// Frame length of the demo loop (~60 fps)
const FRAME_MS: u32 = 16;
/// Give up after this much simulated time
const MAX_FRAMES: u64 = 60 * 60 * 30;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Balloon Race (headless) starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => match MatchConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => MatchConfig::default(),
    };

    let mut state = match RaceState::new(config) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Invalid match config: {e}");
            return ExitCode::FAILURE;
        }
    };

    for (side, team) in [(Side::Player, Team::Red), (Side::Opponent, Team::Blue)] {
        let input = TickInput {
            select: Some(SlotSelection { side, team }),
            ..Default::default()
        };
        tick(&mut state, &input, FRAME_MS);
    }
    if state.phase != MatchPhase::Play {
        log::error!("Race did not start");
        return ExitCode::FAILURE;
    }

    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };
    let mut frames = 0;
    while state.phase == MatchPhase::Play && frames < MAX_FRAMES {
        tick(&mut state, &input, FRAME_MS);
        frames += 1;
        for event in &state.events {
            match event {
                RaceEvent::LapCompleted { racer, lap } => {
                    log::info!("{racer:?} finished lap {lap}");
                }
                RaceEvent::PenaltyStarted { racer, ms } => {
                    log::info!("{racer:?} penalized for {ms} ms");
                }
                RaceEvent::PowerUpCollected { racer, power_up } => {
                    log::info!("{racer:?} picked up {power_up:?}");
                }
                _ => {}
            }
        }
    }

    match state.outcome {
        Some(outcome) => {
            let who = if outcome.winner_is_human { "Human" } else { "AI" };
            println!(
                "{who} racer {:?} won in {:.1} s",
                outcome.winner,
                outcome.race_time_ms as f64 / 1000.0
            );
            ExitCode::SUCCESS
        }
        None => {
            log::warn!("No winner after {frames} frames");
            ExitCode::FAILURE
        }
    }
}
