//! Motion intent and command types.
//!
//! Defines `MotionIntent` (desired motion of one axis), `MotionCommand`
//! (the messages accepted by the intent register) and `IntentKind`
//! (operator-facing intent selection).

use crate::hal::types::{Axis, Direction};
use serde::{Deserialize, Serialize};

/// Desired motion of a single axis.
///
/// Exactly one variant is active per axis, so opposite continuous
/// directions can never be requested at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionIntent {
    /// No motion requested.
    #[default]
    Idle,
    /// One burst in the given direction, consumed after execution.
    StepOnce(Direction),
    /// Repeated bursts until explicitly stopped.
    Continuous(Direction),
    /// Bounded travel issued by a blocking move; `remaining` steps left.
    Travel {
        /// Travel direction.
        direction: Direction,
        /// Steps still to be emitted.
        remaining: u64,
    },
}

impl MotionIntent {
    /// Direction of the requested motion, `None` when idle.
    #[inline]
    pub const fn direction(&self) -> Option<Direction> {
        match self {
            MotionIntent::Idle => None,
            MotionIntent::StepOnce(d) | MotionIntent::Continuous(d) => Some(*d),
            MotionIntent::Travel { direction, .. } => Some(*direction),
        }
    }

    /// Returns true if the axis has pending work.
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, MotionIntent::Idle)
    }

    /// Returns true for `Continuous(direction)`.
    #[inline]
    pub fn is_continuous(&self, direction: Direction) -> bool {
        *self == MotionIntent::Continuous(direction)
    }
}

/// Operator-facing intent selection for `issue_intent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentKind {
    /// One burst.
    StepOnce(Direction),
    /// Toggle continuous motion.
    Continuous(Direction),
}

impl IntentKind {
    /// Command that realises this intent on `axis`.
    pub const fn command(self, axis: Axis) -> MotionCommand {
        match self {
            IntentKind::StepOnce(d) => MotionCommand::StepOnce(axis, d),
            IntentKind::Continuous(d) => MotionCommand::ToggleContinuous(axis, d),
        }
    }
}

/// Messages accepted by the intent register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionCommand {
    /// Request one burst.
    StepOnce(Axis, Direction),
    /// Toggle continuous motion: stops it if already running in this
    /// direction, otherwise starts it (clearing anything else on the axis).
    ToggleContinuous(Axis, Direction),
    /// Force continuous motion in a direction (non-toggling).
    SetContinuous(Axis, Direction),
    /// Bounded travel of `steps` steps.
    Travel(Axis, Direction, u64),
    /// Clear the intent of one axis.
    StopAxis(Axis),
    /// Clear the intents of every axis.
    StopAll,
}

impl MotionCommand {
    /// Axis addressed by this command, `None` for `StopAll`.
    pub const fn axis(&self) -> Option<Axis> {
        match self {
            MotionCommand::StepOnce(a, _)
            | MotionCommand::ToggleContinuous(a, _)
            | MotionCommand::SetContinuous(a, _)
            | MotionCommand::Travel(a, _, _)
            | MotionCommand::StopAxis(a) => Some(*a),
            MotionCommand::StopAll => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_direction() {
        assert_eq!(MotionIntent::Idle.direction(), None);
        assert_eq!(
            MotionIntent::StepOnce(Direction::Forward).direction(),
            Some(Direction::Forward)
        );
        assert_eq!(
            MotionIntent::Travel {
                direction: Direction::Backward,
                remaining: 3
            }
            .direction(),
            Some(Direction::Backward)
        );
        assert!(!MotionIntent::default().is_active());
    }

    #[test]
    fn intent_kind_maps_to_command() {
        assert_eq!(
            IntentKind::Continuous(Direction::Backward).command(Axis::Y),
            MotionCommand::ToggleContinuous(Axis::Y, Direction::Backward)
        );
        assert_eq!(
            IntentKind::StepOnce(Direction::Forward).command(Axis::X),
            MotionCommand::StepOnce(Axis::X, Direction::Forward)
        );
    }

    #[test]
    fn command_axis() {
        assert_eq!(MotionCommand::StopAll.axis(), None);
        assert_eq!(MotionCommand::StopAxis(Axis::X).axis(), Some(Axis::X));
        assert_eq!(
            MotionCommand::Travel(Axis::Y, Direction::Forward, 10).axis(),
            Some(Axis::Y)
        );
    }
}
