//! Homing protocol.
//!
//! Drives each axis, in the configured order, toward its minimum endstop
//! until the switch is pressed and the automatic back-off has finished, then
//! resets both position counters to zero.
//!
//! ## Architecture
//!
//! [`HomingSequence`] is a pure state machine: it is fed an observation of
//! the shared state and answers with the next step. [`HomingProtocol`] polls
//! the shared state, applies the commands and performs the zeroing through
//! the scheduler. The split keeps the phase logic testable without threads.
//!
//! ## Phases (per axis)
//!
//! | Phase      | Leaves when                             | Next        |
//! |------------|-----------------------------------------|-------------|
//! | Settling   | no back-off outstanding                 | Clearing or Approach |
//! | Clearing   | switch opened (started on a closed one) | Approach    |
//! | Approach   | endstop pressed                         | BackingOff  |
//! | BackingOff | back-off finished, flags cleared        | next axis / Zeroing |
//!
//! Every phase is bounded by `timeout`; approach and clearing are also
//! bounded by the travel budget. Exceeding a bound fails with
//! [`HomingError::Timeout`] and the sequence stays failed.

use crate::error::{HomingError, HomingLimit};
use crate::scheduler::SchedulerRequest;
use crate::state::SharedMotionState;
use gantry_common::consts::AXIS_COUNT;
use gantry_common::hal::types::{Axis, Direction};
use gantry_common::motion::command::MotionCommand;
use gantry_common::motion::homing::HomingConfig;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ─── Homing Phases ──────────────────────────────────────────────────

/// Phase of the homing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    /// Waiting for an outstanding back-off to finish.
    Settling,
    /// Driving away from a switch that is closed before the approach.
    Clearing,
    /// Driving toward the endstop.
    Approach,
    /// Endstop hit, automatic back-off running.
    BackingOff,
    /// All axes referenced, counters about to be reset.
    Zeroing,
    /// Homing finished.
    Complete,
    /// Homing failed.
    Failed,
}

impl fmt::Display for HomingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HomingPhase::Settling => "settling",
            HomingPhase::Clearing => "clearing",
            HomingPhase::Approach => "approach",
            HomingPhase::BackingOff => "back-off",
            HomingPhase::Zeroing => "zeroing",
            HomingPhase::Complete => "complete",
            HomingPhase::Failed => "failed",
        })
    }
}

// ─── Observation / Step ─────────────────────────────────────────────

/// Shared state as seen by one homing update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HomingObservation {
    /// Time since homing started.
    pub elapsed: Duration,
    /// Position counters (X, Y).
    pub positions: [i64; AXIS_COUNT],
    /// `pressed` flags (X, Y).
    pub pressed: [bool; AXIS_COUNT],
    /// `backoff_active` flags (X, Y).
    pub backoff_active: [bool; AXIS_COUNT],
    /// Physical switch levels (X, Y).
    pub switch_closed: [bool; AXIS_COUNT],
}

impl HomingObservation {
    /// Capture the shared state.
    pub fn capture(shared: &SharedMotionState, elapsed: Duration) -> Self {
        Self {
            elapsed,
            positions: shared.positions(),
            pressed: Axis::ALL.map(|axis| shared.endstops.is_pressed(axis)),
            backoff_active: Axis::ALL.map(|axis| shared.endstops.is_backoff_active(axis)),
            switch_closed: Axis::ALL.map(|axis| shared.endstops.is_switch_closed(axis)),
        }
    }

    fn engaged(&self, axis: Axis) -> bool {
        self.pressed[axis.index()] || self.backoff_active[axis.index()]
    }
}

/// What the protocol must do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingStep {
    /// Apply this command to the intent register.
    Command(MotionCommand),
    /// Nothing to do; poll again.
    Wait,
    /// Reset both position counters on the scheduler thread.
    ZeroPositions,
    /// Homing finished.
    Done,
}

// ─── Homing Sequence ────────────────────────────────────────────────

/// Homing state machine over all axes.
#[derive(Debug, Clone)]
pub struct HomingSequence {
    order: Vec<Axis>,
    limit: [Direction; AXIS_COUNT],
    timeout: Duration,
    max_travel: u64,
    current: usize,
    phase: HomingPhase,
    phase_started: Duration,
    travel_origin: i64,
    failure: Option<HomingError>,
}

impl HomingSequence {
    /// Create a sequence; `limit_directions` travel toward each endstop.
    pub fn new(config: &HomingConfig, limit_directions: [Direction; AXIS_COUNT]) -> Self {
        Self {
            order: config.order.clone(),
            limit: limit_directions,
            timeout: config.timeout(),
            max_travel: config.max_travel_steps,
            current: 0,
            phase: HomingPhase::Settling,
            phase_started: Duration::ZERO,
            travel_origin: 0,
            failure: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    /// Axis being homed, `None` once every axis is done.
    pub fn axis(&self) -> Option<Axis> {
        self.order.get(self.current).copied()
    }

    /// Advance with a fresh observation.
    pub fn update(&mut self, obs: &HomingObservation) -> Result<HomingStep, HomingError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let Some(axis) = self.axis() else {
            return match self.phase {
                HomingPhase::Zeroing => {
                    self.enter(HomingPhase::Complete, None, obs);
                    Ok(HomingStep::ZeroPositions)
                }
                HomingPhase::Complete => Ok(HomingStep::Done),
                _ => {
                    self.enter(HomingPhase::Zeroing, None, obs);
                    Ok(HomingStep::Wait)
                }
            };
        };
        let i = axis.index();

        match self.phase {
            HomingPhase::Settling => {
                if obs.engaged(axis) {
                    return self.check_bounds(axis, obs, false);
                }
                if obs.switch_closed[i] {
                    self.enter(HomingPhase::Clearing, Some(axis), obs);
                    Ok(HomingStep::Command(MotionCommand::SetContinuous(
                        axis,
                        self.limit[i].opposite(),
                    )))
                } else {
                    self.enter(HomingPhase::Approach, Some(axis), obs);
                    Ok(HomingStep::Command(MotionCommand::SetContinuous(axis, self.limit[i])))
                }
            }
            HomingPhase::Clearing => {
                if obs.engaged(axis) {
                    self.enter(HomingPhase::Settling, Some(axis), obs);
                    return Ok(HomingStep::Wait);
                }
                if !obs.switch_closed[i] {
                    self.enter(HomingPhase::Approach, Some(axis), obs);
                    return Ok(HomingStep::Command(MotionCommand::SetContinuous(
                        axis,
                        self.limit[i],
                    )));
                }
                self.check_bounds(axis, obs, true)
            }
            HomingPhase::Approach => {
                if obs.engaged(axis) {
                    self.enter(HomingPhase::BackingOff, Some(axis), obs);
                    return Ok(HomingStep::Wait);
                }
                self.check_bounds(axis, obs, true)
            }
            HomingPhase::BackingOff => {
                if obs.engaged(axis) {
                    return self.check_bounds(axis, obs, false);
                }
                info!("Axis {} referenced at its endstop", axis);
                self.current += 1;
                match self.axis() {
                    Some(next) => self.enter(HomingPhase::Settling, Some(next), obs),
                    None => self.enter(HomingPhase::Zeroing, None, obs),
                }
                Ok(HomingStep::Wait)
            }
            HomingPhase::Zeroing | HomingPhase::Complete | HomingPhase::Failed => {
                Ok(HomingStep::Wait)
            }
        }
    }

    fn enter(&mut self, phase: HomingPhase, axis: Option<Axis>, obs: &HomingObservation) {
        match axis {
            Some(axis) => {
                debug!("Homing axis {}: {} -> {}", axis, self.phase, phase);
                self.travel_origin = obs.positions[axis.index()];
            }
            None => debug!("Homing: {} -> {}", self.phase, phase),
        }
        self.phase = phase;
        self.phase_started = obs.elapsed;
    }

    fn check_bounds(
        &mut self,
        axis: Axis,
        obs: &HomingObservation,
        moving: bool,
    ) -> Result<HomingStep, HomingError> {
        let limit = if obs.elapsed.saturating_sub(self.phase_started) > self.timeout {
            Some(HomingLimit::Elapsed(self.timeout))
        } else if moving
            && obs.positions[axis.index()].abs_diff(self.travel_origin) > self.max_travel
        {
            Some(HomingLimit::Travel(self.max_travel))
        } else {
            None
        };

        match limit {
            None => Ok(HomingStep::Wait),
            Some(limit) => {
                let err = HomingError::Timeout {
                    axis,
                    phase: self.phase,
                    limit,
                };
                warn!("{}", err);
                self.phase = HomingPhase::Failed;
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }
}

// ─── Homing Protocol ────────────────────────────────────────────────

/// Runs a [`HomingSequence`] against the shared motion state.
#[derive(Debug, Clone)]
pub struct HomingProtocol {
    config: HomingConfig,
    limit: [Direction; AXIS_COUNT],
    poll: Duration,
}

impl HomingProtocol {
    /// Create a protocol polling every `poll`.
    pub fn new(config: &HomingConfig, limit_directions: [Direction; AXIS_COUNT], poll: Duration) -> Self {
        Self {
            config: config.clone(),
            limit: limit_directions,
            poll,
        }
    }

    /// Home both axes. Blocks until done or failed.
    ///
    /// On success both counters are zero and the state is referenced. On
    /// failure the caller is responsible for stopping and disabling.
    pub fn run(&self, shared: &SharedMotionState) -> Result<(), HomingError> {
        info!("Homing started (order: {:?})", self.config.order);
        // Leftover operator intents would drive the carriage during the approach.
        shared.register.apply(MotionCommand::StopAll);
        shared.set_referenced(false);
        // A fault from an earlier motion must not fail this run.
        shared.take_fault();

        let mut sequence = HomingSequence::new(&self.config, self.limit);
        let start = Instant::now();
        loop {
            if !shared.is_running() {
                return Err(HomingError::NotRunning);
            }
            if let Some((axis, err)) = shared.take_fault() {
                warn!("Homing aborted, axis {} failed to step", axis);
                return Err(err.into());
            }

            let obs = HomingObservation::capture(shared, start.elapsed());
            match sequence.update(&obs)? {
                HomingStep::Command(command) => shared.register.apply(command),
                HomingStep::Wait => std::thread::sleep(self.poll),
                HomingStep::ZeroPositions => {
                    if !shared.submit_and_wait(
                        SchedulerRequest::ZeroPositions,
                        self.poll,
                        self.config.timeout(),
                    ) {
                        return Err(HomingError::NotRunning);
                    }
                }
                HomingStep::Done => {
                    shared.set_referenced(true);
                    info!("Homing complete in {} ms", start.elapsed().as_millis());
                    return Ok(());
                }
            }
        }
    }
}
