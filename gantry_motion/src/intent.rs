//! Motion intent register.
//!
//! The register is the single owner of the desired motion of both axes.
//! `apply()` is the only mutator reachable from outside the scheduler; it is
//! total and only holds the lock for a few field writes.
//!
//! # Rules
//!
//! - The latest command on an axis replaces whatever was pending there, so
//!   the two continuous directions and a pending single step are mutually
//!   exclusive by construction.
//! - `StopAll` clears both axes unconditionally.
//! - Every change bumps the axis revision. The scheduler settles a burst
//!   against the revision it snapshotted, so a command that arrives while a
//!   burst is being emitted is never overwritten by the bookkeeping of that
//!   burst.
//! - A `Travel` that is replaced before it finishes records
//!   [`TravelOutcome::Aborted`]; one that runs out records `Completed`.

use gantry_common::consts::AXIS_COUNT;
use gantry_common::hal::types::Axis;
use gantry_common::motion::command::{MotionCommand, MotionIntent};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// How a bounded travel ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelOutcome {
    /// All steps were emitted.
    Completed,
    /// Replaced by another command with `remaining` steps left.
    Aborted {
        /// Steps that were not emitted.
        remaining: u64,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    intent: MotionIntent,
    revision: u64,
    outcome: Option<TravelOutcome>,
}

impl Slot {
    fn replace(&mut self, axis: Axis, intent: MotionIntent) {
        if let MotionIntent::Travel { remaining, .. } = self.intent {
            if intent != self.intent {
                debug!("Travel on axis {} cancelled with {} steps left", axis, remaining);
                self.outcome = Some(TravelOutcome::Aborted { remaining });
            }
        }
        self.intent = intent;
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Per-axis intents and their revisions as seen at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentSnapshot {
    intents: [MotionIntent; AXIS_COUNT],
    revisions: [u64; AXIS_COUNT],
}

impl IntentSnapshot {
    /// Intent of `axis`.
    #[inline]
    pub fn intent(&self, axis: Axis) -> MotionIntent {
        self.intents[axis.index()]
    }

    /// Revision of `axis` at snapshot time.
    #[inline]
    pub fn revision(&self, axis: Axis) -> u64 {
        self.revisions[axis.index()]
    }

    /// Whether any axis has pending work.
    pub fn has_work(&self) -> bool {
        self.intents.iter().any(MotionIntent::is_active)
    }
}

/// Single owner of the desired motion of both axes.
#[derive(Debug, Default)]
pub struct IntentRegister {
    slots: Mutex<[Slot; AXIS_COUNT]>,
}

impl IntentRegister {
    /// Create a register with both axes idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one command. Never fails and never blocks on I/O.
    pub fn apply(&self, command: MotionCommand) {
        Self::apply_locked(&mut self.slots.lock(), command);
    }

    /// Apply `command` and return the revision `axis` carries afterwards,
    /// read under the same lock.
    pub fn apply_tracked(&self, axis: Axis, command: MotionCommand) -> u64 {
        let mut slots = self.slots.lock();
        Self::apply_locked(&mut slots, command);
        slots[axis.index()].revision
    }

    /// Clear `axis` only if nothing was applied to it since `revision`.
    ///
    /// Returns false (and changes nothing) if a newer command owns the axis.
    pub fn stop_if_current(&self, axis: Axis, revision: u64) -> bool {
        let mut slots = self.slots.lock();
        let slot = &mut slots[axis.index()];
        if slot.revision != revision {
            return false;
        }
        slot.replace(axis, MotionIntent::Idle);
        true
    }

    fn apply_locked(slots: &mut [Slot; AXIS_COUNT], command: MotionCommand) {
        match command {
            MotionCommand::StepOnce(axis, direction) => {
                slots[axis.index()].replace(axis, MotionIntent::StepOnce(direction));
            }
            MotionCommand::ToggleContinuous(axis, direction) => {
                let slot = &mut slots[axis.index()];
                let next = if slot.intent.is_continuous(direction) {
                    MotionIntent::Idle
                } else {
                    MotionIntent::Continuous(direction)
                };
                slot.replace(axis, next);
            }
            MotionCommand::SetContinuous(axis, direction) => {
                let slot = &mut slots[axis.index()];
                if !slot.intent.is_continuous(direction) {
                    slot.replace(axis, MotionIntent::Continuous(direction));
                }
            }
            MotionCommand::Travel(axis, direction, steps) => {
                let slot = &mut slots[axis.index()];
                if steps == 0 {
                    slot.replace(axis, MotionIntent::Idle);
                    slot.outcome = Some(TravelOutcome::Completed);
                } else {
                    slot.replace(
                        axis,
                        MotionIntent::Travel {
                            direction,
                            remaining: steps,
                        },
                    );
                    slot.outcome = None;
                }
            }
            MotionCommand::StopAxis(axis) => {
                slots[axis.index()].replace(axis, MotionIntent::Idle);
            }
            MotionCommand::StopAll => {
                for axis in Axis::ALL {
                    slots[axis.index()].replace(axis, MotionIntent::Idle);
                }
            }
        }
        trace!("Applied {:?}", command);
    }

    /// Intents of both axes, read once per scheduler tick.
    pub fn snapshot(&self) -> IntentSnapshot {
        let slots = self.slots.lock();
        let mut snapshot = IntentSnapshot::default();
        for axis in Axis::ALL {
            let slot = &slots[axis.index()];
            snapshot.intents[axis.index()] = slot.intent;
            snapshot.revisions[axis.index()] = slot.revision;
        }
        snapshot
    }

    /// Current intent of one axis.
    pub fn intent(&self, axis: Axis) -> MotionIntent {
        self.slots.lock()[axis.index()].intent
    }

    /// Book a burst of `executed` steps against the intent seen at `revision`.
    ///
    /// Consumes `StepOnce`, counts down `Travel` and leaves `Continuous`
    /// untouched. Returns false (and changes nothing) if the axis received a
    /// newer command in the meantime.
    pub fn settle(&self, axis: Axis, revision: u64, executed: u64) -> bool {
        let mut slots = self.slots.lock();
        let slot = &mut slots[axis.index()];
        if slot.revision != revision {
            return false;
        }
        match slot.intent {
            MotionIntent::StepOnce(_) => slot.replace(axis, MotionIntent::Idle),
            MotionIntent::Travel {
                direction,
                remaining,
            } => {
                let left = remaining.saturating_sub(executed);
                if left == 0 {
                    slot.intent = MotionIntent::Idle;
                    slot.revision = slot.revision.wrapping_add(1);
                    slot.outcome = Some(TravelOutcome::Completed);
                } else {
                    slot.intent = MotionIntent::Travel {
                        direction,
                        remaining: left,
                    };
                }
            }
            MotionIntent::Continuous(_) | MotionIntent::Idle => {}
        }
        true
    }

    /// Take the recorded end of the last travel on `axis`.
    pub fn take_travel_outcome(&self, axis: Axis) -> Option<TravelOutcome> {
        self.slots.lock()[axis.index()].outcome.take()
    }
}
