//! Endstop monitor.
//!
//! Holds the `pressed` / `backoff_active` flags of both axes and reacts to
//! debounced edges. The reaction runs on the sensor's context, so it only
//! flips atomics, applies `StopAll` to the register and enqueues a back-off.
//!
//! ```text
//!   Released ──Pressed edge──► Pressed ──scheduler starts task──► BackingOff
//!      ▲                                                              │
//!      └──────────────── task finished: flags cleared ◄──────────────┘
//! ```
//!
//! A `Pressed` edge that arrives while the axis is still backing off is
//! dropped entirely: at most one back-off per axis is ever outstanding.
//! `Released` edges are informational and never resume motion.

use crate::backoff::{BackoffController, BackoffRequest};
use crate::intent::IntentRegister;
use gantry_common::consts::AXIS_COUNT;
use gantry_common::hal::types::{Axis, Direction, EndstopEdge};
use gantry_common::motion::command::MotionCommand;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Observable endstop state of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndstopPhase {
    /// Not pressed.
    Released,
    /// Pressed, back-off not yet running.
    Pressed,
    /// Back-off in progress.
    BackingOff,
}

/// Result of handling one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeReaction {
    /// Flags set, register stopped, back-off enqueued.
    BackoffRequested,
    /// Back-off already active; the edge was ignored.
    Suppressed,
    /// Switch opened.
    Released,
}

#[derive(Debug, Default)]
struct AxisEndstop {
    pressed: AtomicBool,
    backoff_active: AtomicBool,
    switch_closed: AtomicBool,
    press_events: AtomicU64,
    suppressed: AtomicU64,
}

/// Endstop flags of both axes.
#[derive(Debug)]
pub struct EndstopMonitor {
    axes: [AxisEndstop; AXIS_COUNT],
    away: [Direction; AXIS_COUNT],
}

impl EndstopMonitor {
    /// Create a monitor; `limit_directions` are the directions (X, Y) that
    /// travel toward each switch.
    pub fn new(limit_directions: [Direction; AXIS_COUNT]) -> Self {
        Self {
            axes: Default::default(),
            away: limit_directions.map(Direction::opposite),
        }
    }

    /// React to a debounced edge of `axis`.
    pub fn on_edge(
        &self,
        axis: Axis,
        edge: EndstopEdge,
        register: &IntentRegister,
        backoff: &BackoffController,
    ) -> EdgeReaction {
        let state = &self.axes[axis.index()];
        match edge {
            EndstopEdge::Pressed => {
                state.switch_closed.store(true, Ordering::SeqCst);
                state.press_events.fetch_add(1, Ordering::SeqCst);

                if state.backoff_active.load(Ordering::SeqCst) {
                    let n = state.suppressed.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!("Endstop {} pressed during back-off, ignored (#{})", axis, n);
                    return EdgeReaction::Suppressed;
                }

                state.pressed.store(true, Ordering::SeqCst);
                register.apply(MotionCommand::StopAll);

                if state
                    .backoff_active
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    state.suppressed.fetch_add(1, Ordering::SeqCst);
                    return EdgeReaction::Suppressed;
                }

                warn!("Endstop {} pressed: all axes stopped, backing off", axis);
                backoff.request(BackoffRequest {
                    axis,
                    away: self.away[axis.index()],
                });
                EdgeReaction::BackoffRequested
            }
            EndstopEdge::Released => {
                state.switch_closed.store(false, Ordering::SeqCst);
                info!("Endstop {} released", axis);
                EdgeReaction::Released
            }
        }
    }

    /// Clear both flags at the end of a back-off.
    pub(crate) fn finish_backoff(&self, axis: Axis) {
        let state = &self.axes[axis.index()];
        state.pressed.store(false, Ordering::SeqCst);
        state.backoff_active.store(false, Ordering::SeqCst);
    }

    /// Whether `axis` is inhibited toward its limit.
    #[inline]
    pub fn is_pressed(&self, axis: Axis) -> bool {
        self.axes[axis.index()].pressed.load(Ordering::SeqCst)
    }

    /// Whether a back-off of `axis` is outstanding.
    #[inline]
    pub fn is_backoff_active(&self, axis: Axis) -> bool {
        self.axes[axis.index()].backoff_active.load(Ordering::SeqCst)
    }

    /// Physical switch level as reported by the last edge.
    #[inline]
    pub fn is_switch_closed(&self, axis: Axis) -> bool {
        self.axes[axis.index()].switch_closed.load(Ordering::SeqCst)
    }

    /// First axis whose endstop is pressed, if any.
    pub fn any_pressed(&self) -> Option<Axis> {
        Axis::ALL.into_iter().find(|axis| self.is_pressed(*axis))
    }

    /// Observable phase of `axis`.
    pub fn phase(&self, axis: Axis) -> EndstopPhase {
        match (self.is_pressed(axis), self.is_backoff_active(axis)) {
            (_, true) => EndstopPhase::BackingOff,
            (true, false) => EndstopPhase::Pressed,
            (false, false) => EndstopPhase::Released,
        }
    }

    /// Direction leading away from the switch of `axis`.
    pub fn away_direction(&self, axis: Axis) -> Direction {
        self.away[axis.index()]
    }

    /// `Pressed` edges seen on `axis`.
    pub fn press_events(&self, axis: Axis) -> u64 {
        self.axes[axis.index()].press_events.load(Ordering::SeqCst)
    }

    /// `Pressed` edges ignored because a back-off was active.
    pub fn suppressed_presses(&self, axis: Axis) -> u64 {
        self.axes[axis.index()].suppressed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_common::motion::command::MotionIntent;
    use std::time::Duration;

    fn fixture() -> (EndstopMonitor, IntentRegister, BackoffController) {
        (
            EndstopMonitor::new([Direction::Backward, Direction::Backward]),
            IntentRegister::new(),
            BackoffController::new(Duration::from_millis(300)),
        )
    }

    #[test]
    fn press_stops_every_axis_and_requests_backoff() {
        let (monitor, register, backoff) = fixture();
        register.apply(MotionCommand::ToggleContinuous(Axis::X, Direction::Forward));
        register.apply(MotionCommand::ToggleContinuous(Axis::Y, Direction::Backward));

        let reaction = monitor.on_edge(Axis::Y, EndstopEdge::Pressed, &register, &backoff);

        assert_eq!(reaction, EdgeReaction::BackoffRequested);
        assert!(monitor.is_pressed(Axis::Y));
        assert!(monitor.is_backoff_active(Axis::Y));
        assert_eq!(register.intent(Axis::X), MotionIntent::Idle);
        assert_eq!(register.intent(Axis::Y), MotionIntent::Idle);
        assert_eq!(
            backoff.drain_requests(),
            vec![BackoffRequest {
                axis: Axis::Y,
                away: Direction::Forward
            }]
        );
    }

    #[test]
    fn press_during_backoff_is_a_no_op() {
        let (monitor, register, backoff) = fixture();
        monitor.on_edge(Axis::X, EndstopEdge::Pressed, &register, &backoff);
        register.apply(MotionCommand::SetContinuous(Axis::X, Direction::Forward));

        let reaction = monitor.on_edge(Axis::X, EndstopEdge::Pressed, &register, &backoff);

        assert_eq!(reaction, EdgeReaction::Suppressed);
        assert_eq!(backoff.drain_requests().len(), 1);
        assert_eq!(
            register.intent(Axis::X),
            MotionIntent::Continuous(Direction::Forward)
        );
        assert_eq!(monitor.suppressed_presses(Axis::X), 1);
        assert_eq!(monitor.press_events(Axis::X), 2);
    }

    #[test]
    fn release_is_informational() {
        let (monitor, register, backoff) = fixture();
        monitor.on_edge(Axis::X, EndstopEdge::Pressed, &register, &backoff);
        assert!(monitor.is_switch_closed(Axis::X));

        let reaction = monitor.on_edge(Axis::X, EndstopEdge::Released, &register, &backoff);
        assert_eq!(reaction, EdgeReaction::Released);
        assert!(!monitor.is_switch_closed(Axis::X));
        assert!(monitor.is_pressed(Axis::X));
        assert_eq!(monitor.phase(Axis::X), EndstopPhase::BackingOff);
    }

    #[test]
    fn finish_backoff_clears_flags() {
        let (monitor, register, backoff) = fixture();
        monitor.on_edge(Axis::Y, EndstopEdge::Pressed, &register, &backoff);
        monitor.finish_backoff(Axis::Y);
        assert_eq!(monitor.phase(Axis::Y), EndstopPhase::Released);
        assert_eq!(monitor.any_pressed(), None);

        // A fresh press after the back-off starts a new one.
        let reaction = monitor.on_edge(Axis::Y, EndstopEdge::Pressed, &register, &backoff);
        assert_eq!(reaction, EdgeReaction::BackoffRequested);
        assert_eq!(backoff.drain_requests().len(), 2);
    }
}
