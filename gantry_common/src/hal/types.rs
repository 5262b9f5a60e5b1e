//! Hardware-facing value types.
//!
//! This module defines the small value types exchanged with the HAL:
//! - `Axis` / `Direction` - Addressing and travel sense of a step burst
//! - `EndstopEdge` - Debounced edge reported by an endstop sensor
//! - `StepMode` / `StepModeControl` - Micro-step configuration of a driver

use crate::consts::AXIS_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One independently driven linear degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal axis.
    X,
    /// Vertical axis.
    Y,
}

impl Axis {
    /// Both axes in index order.
    pub const ALL: [Axis; AXIS_COUNT] = [Axis::X, Axis::Y];

    /// Array index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }

    /// Lowercase name used in configuration and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Travel sense of an axis. `Forward` increases the position counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Positive travel.
    Forward,
    /// Negative travel.
    Backward,
}

impl Direction {
    /// Get the opposite direction.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Sign applied to the position counter for a step in this direction.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    /// Direction that travels `delta` steps (zero maps to `Forward`).
    #[inline]
    pub const fn of_delta(delta: i64) -> Self {
        if delta < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

/// Debounced endstop edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndstopEdge {
    /// Switch became active (carriage reached the limit).
    Pressed,
    /// Switch became inactive.
    Released,
}

/// Micro-step resolution of a DRV8825-class driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StepMode {
    /// One pulse per full step.
    #[serde(rename = "full")]
    Full,
    /// Half stepping.
    #[serde(rename = "half")]
    Half,
    /// 1/4 micro-stepping.
    #[serde(rename = "1/4")]
    Quarter,
    /// 1/8 micro-stepping.
    #[serde(rename = "1/8")]
    Eighth,
    /// 1/16 micro-stepping.
    #[serde(rename = "1/16")]
    Sixteenth,
    /// 1/32 micro-stepping.
    #[serde(rename = "1/32")]
    #[default]
    ThirtySecond,
}

impl StepMode {
    /// All recognised modes, coarsest first.
    pub const ALL: [StepMode; 6] = [
        StepMode::Full,
        StepMode::Half,
        StepMode::Quarter,
        StepMode::Eighth,
        StepMode::Sixteenth,
        StepMode::ThirtySecond,
    ];

    /// Levels of the three mode pins (M0, M1, M2).
    pub const fn mode_pins(self) -> [bool; 3] {
        match self {
            StepMode::Full => [false, false, false],
            StepMode::Half => [true, false, false],
            StepMode::Quarter => [false, true, false],
            StepMode::Eighth => [true, true, false],
            StepMode::Sixteenth => [false, false, true],
            StepMode::ThirtySecond => [true, false, true],
        }
    }

    /// Micro-steps per full step.
    pub const fn divisor(self) -> u32 {
        match self {
            StepMode::Full => 1,
            StepMode::Half => 2,
            StepMode::Quarter => 4,
            StepMode::Eighth => 8,
            StepMode::Sixteenth => 16,
            StepMode::ThirtySecond => 32,
        }
    }
}

/// Who selects the micro-step mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepModeControl {
    /// Switches on the driver board; mode pins are left untouched.
    Hardware,
    /// Mode pins are driven from software.
    #[default]
    Software,
}
