//! Per-frame simulation tick
//!
//! The render loop calls [`tick`] once per frame. Inside PLAY, the human's
//! wind correction runs on a fixed 30 ms driver fed by an accumulator, while
//! AI racers and pickups are updated once per frame. Within a wind step the
//! checkpoint is evaluated before movement, and pickups are resolved only
//! after every position for the frame is final.

use glam::Vec3;

use super::collision::resolve_pickups;
use super::racer::{Heading, RacerId, WindOutcome, WindParams, wind_step};
use super::state::{MatchPhase, RaceEvent, RaceState, Side};
use super::Team;
use crate::consts::*;

/// A slot-selection click from the lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSelection {
    pub side: Side,
    pub team: Team,
}

/// Input events for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Climb one step (human only)
    pub move_up: bool,
    /// Descend one step (human only)
    pub move_down: bool,
    /// Pause toggle
    pub pause: bool,
    /// Lobby slot click
    pub select: Option<SlotSelection>,
    /// Idle/demo mode - the sim flies the human balloon
    pub idle_mode: bool,
}

/// Advance the match by one frame of `dt_ms` milliseconds
pub fn tick(state: &mut RaceState, input: &TickInput, dt_ms: u32) {
    state.events.clear();

    // Handle pause toggle at the start of the frame, so a pause freezes race
    // time exactly where the last frame left it and a resume plays this frame
    if input.pause {
        match state.phase {
            MatchPhase::Play => {
                state.pause();
            }
            MatchPhase::Pause => {
                state.resume();
            }
            MatchPhase::Init | MatchPhase::End => {}
        }
    }

    state.clock_ms += dt_ms as u64;

    match state.phase {
        MatchPhase::Init => lobby_tick(state, input),
        MatchPhase::Play => play_tick(state, input, dt_ms),
        MatchPhase::Pause | MatchPhase::End => {}
    }
}

fn lobby_tick(state: &mut RaceState, input: &TickInput) {
    let Some(selection) = input.select else {
        return;
    };
    state.bind_slot(selection.side, selection.team);
    if state.slot(Side::Player).is_some() && state.slot(Side::Opponent).is_some() {
        if let Err(e) = state.start() {
            log::warn!("Cannot start race: {e}");
        }
    }
}

fn play_tick(state: &mut RaceState, input: &TickInput, dt_ms: u32) {
    // Idle/demo mode - steer by altitude toward the next checkpoint
    let mut input = input.clone();
    if input.idle_mode {
        let (up, down) = autopilot(state);
        input.move_up = up;
        input.move_down = down;
    }

    // Vertical control and scale feedback
    let step = state.config().altitude_step;
    if let Some(human) = state.human_mut() {
        if input.move_up && !input.move_down {
            human.move_up(step);
        } else if input.move_down && !input.move_up {
            human.move_down(step);
        }
        human.scale.update(dt_ms);
    }

    // Fixed-period wind driver
    state.wind_accumulator_ms = state.wind_accumulator_ms.saturating_add(dt_ms);
    let mut substeps = 0;
    while state.wind_accumulator_ms >= WIND_TICK_MS && substeps < MAX_WIND_SUBSTEPS {
        wind_tick(state);
        state.wind_accumulator_ms -= WIND_TICK_MS;
        substeps += 1;
        if state.phase != MatchPhase::Play {
            return;
        }
    }
    if state.wind_accumulator_ms >= WIND_TICK_MS {
        log::debug!(
            "Dropping {} ms of wind time after {} substeps",
            state.wind_accumulator_ms,
            substeps
        );
        state.wind_accumulator_ms %= WIND_TICK_MS;
    }

    // AI racers follow their routes on race time
    let race_time = state.race_time_ms();
    let total_laps = state.config().total_laps;
    let mut ai_finisher: Option<RacerId> = None;
    for racer in state.racers.iter_mut() {
        let Some(route) = racer.route() else {
            continue;
        };
        let laps = route.laps_completed(race_time);
        racer.follow_route(race_time);
        while racer.progress.laps_completed() < laps {
            state.events.push(RaceEvent::LapCompleted {
                racer: racer.id,
                lap: racer.progress.lap,
            });
            racer.progress.lap += 1;
            racer.forget_power_ups();
        }
        if laps >= total_laps && ai_finisher.is_none() {
            ai_finisher = Some(racer.id);
        }
    }

    // Pickups against final positions
    for racer in state.racers.iter_mut() {
        for pickup in resolve_pickups(racer, &mut state.power_ups) {
            state.events.push(RaceEvent::PowerUpCollected {
                racer: pickup.racer,
                power_up: pickup.power_up,
            });
        }
    }

    if let Some(winner) = ai_finisher {
        state.finish(winner);
    }
}

/// One 30 ms step for the human racer: checkpoint first, then wind
fn wind_tick(state: &mut RaceState) {
    let params = WindParams::from_config(state.config());
    let total_laps = state.config().total_laps;
    let mut finisher: Option<RacerId> = None;

    for racer in state.racers.iter_mut().filter(|r| r.is_human()) {
        if let Some(crossing) = state.checkpoints.check_current_checkpoint(racer) {
            log::debug!("Racer {:?} crossed checkpoint {}", racer.id, crossing.index);
            state.events.push(RaceEvent::CheckpointCrossed {
                racer: racer.id,
                index: crossing.index,
            });
            if let Some(lap) = crossing.lap_completed {
                log::info!("Racer {:?} completed lap {}", racer.id, lap);
                state.events.push(RaceEvent::LapCompleted { racer: racer.id, lap });
                if lap >= total_laps {
                    finisher = Some(racer.id);
                    break;
                }
            }
        }

        match wind_step(racer, &state.circuit, &params, WIND_TICK_MS) {
            WindOutcome::Snapped {
                sample,
                credit_used,
            } => {
                state.events.push(RaceEvent::Snapped {
                    racer: racer.id,
                    sample,
                });
                state.events.push(if credit_used {
                    RaceEvent::CreditConsumed {
                        racer: racer.id,
                        remaining: racer.extra_lives,
                    }
                } else {
                    RaceEvent::PenaltyStarted {
                        racer: racer.id,
                        ms: racer.penalty_remaining_ms,
                    }
                });
            }
            WindOutcome::Penalized { .. } | WindOutcome::Drifted(_) | WindOutcome::NoTrack => {}
        }
    }

    if let Some(winner) = finisher {
        state.finish(winner);
    }
}

/// Pick a vertical input that moves the human toward the altitude band whose
/// wind points most directly at its next checkpoint
fn autopilot(state: &RaceState) -> (bool, bool) {
    let Some(human) = state.human() else {
        return (false, false);
    };
    if human.in_penalty() {
        return (false, false);
    }
    let target = state.checkpoints().next_for(&human.progress);
    let to_target = Vec3::new(target.x - human.pos.x, 0.0, target.z - human.pos.z);

    let best = Heading::ALL
        .into_iter()
        .max_by(|a, b| {
            a.direction()
                .dot(to_target)
                .partial_cmp(&b.direction().dot(to_target))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(human.heading);
    if best == human.heading {
        return (false, false);
    }

    let desired = best.band_center(human.min_height, human.max_height);
    let step = state.config().altitude_step;
    if desired > human.pos.y + step * 0.5 {
        (true, false)
    } else if desired < human.pos.y - step * 0.5 {
        (false, true)
    } else {
        (false, false)
    }
}
