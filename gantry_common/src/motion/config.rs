//! Configuration structures for the motion core.
//!
//! All config types use `serde::Deserialize` for TOML loading and default
//! every field, so an absent table yields a working setup.

use crate::consts::{
    DEFAULT_BACKOFF_DURATION_MS, DEFAULT_BURST_STEPS, DEFAULT_CALIBRATION_DIR,
    DEFAULT_CALIBRATION_LABEL, DEFAULT_CYCLE_LOG, DEFAULT_IDLE_INTERVAL_MS,
    DEFAULT_MAX_TICK_LATENCY_MS, DEFAULT_POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_burst_steps() -> u32 {
    DEFAULT_BURST_STEPS
}
fn default_idle_interval_ms() -> u64 {
    DEFAULT_IDLE_INTERVAL_MS
}
fn default_max_tick_latency_ms() -> u64 {
    DEFAULT_MAX_TICK_LATENCY_MS
}
fn default_backoff_duration_ms() -> u64 {
    DEFAULT_BACKOFF_DURATION_MS
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_calibration_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CALIBRATION_DIR)
}
fn default_cycle_log() -> PathBuf {
    PathBuf::from(DEFAULT_CYCLE_LOG)
}
fn default_calibration_label() -> String {
    DEFAULT_CALIBRATION_LABEL.to_string()
}

// ─── Motion ─────────────────────────────────────────────────────────

/// `[motion]` configuration: scheduler and back-off timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionConfig {
    /// Micro-steps emitted per axis and tick.
    #[serde(default = "default_burst_steps")]
    pub burst_steps: u32,

    /// Scheduler sleep when nothing is pending [ms].
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Tick duration above which an overrun is reported [ms].
    #[serde(default = "default_max_tick_latency_ms")]
    pub max_tick_latency_ms: u64,

    /// How long a back-off drives away from a pressed endstop [ms].
    #[serde(default = "default_backoff_duration_ms")]
    pub backoff_duration_ms: u64,

    /// Poll period of blocking calls [ms].
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl MotionConfig {
    /// Idle sleep as Duration.
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    /// Latency budget as Duration.
    pub fn max_tick_latency(&self) -> Duration {
        Duration::from_millis(self.max_tick_latency_ms)
    }

    /// Back-off duration as Duration.
    pub fn backoff_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_duration_ms)
    }

    /// Poll period as Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the motion configuration.
    ///
    /// # Validation Rules
    /// 1. `burst_steps` > 0
    /// 2. `idle_interval_ms` <= `max_tick_latency_ms` (a stop must land within one tick)
    /// 3. `backoff_duration_ms` > 0
    /// 4. `poll_interval_ms` > 0
    pub fn validate(&self) -> Result<(), String> {
        if self.burst_steps == 0 {
            return Err("motion.burst_steps must be greater than 0".to_string());
        }
        if self.idle_interval_ms > self.max_tick_latency_ms {
            return Err(format!(
                "motion.idle_interval_ms ({}) exceeds motion.max_tick_latency_ms ({})",
                self.idle_interval_ms, self.max_tick_latency_ms
            ));
        }
        if self.backoff_duration_ms == 0 {
            return Err("motion.backoff_duration_ms must be greater than 0".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("motion.poll_interval_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            burst_steps: DEFAULT_BURST_STEPS,
            idle_interval_ms: DEFAULT_IDLE_INTERVAL_MS,
            max_tick_latency_ms: DEFAULT_MAX_TICK_LATENCY_MS,
            backoff_duration_ms: DEFAULT_BACKOFF_DURATION_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

// ─── Storage ────────────────────────────────────────────────────────

/// `[storage]` configuration: where records and logs live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding one calibration file per label.
    #[serde(default = "default_calibration_dir")]
    pub calibration_dir: PathBuf,

    /// Append-only work-cycle log.
    #[serde(default = "default_cycle_log")]
    pub cycle_log: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            calibration_dir: default_calibration_dir(),
            cycle_log: default_cycle_log(),
        }
    }
}

// ─── Wash Cycle ─────────────────────────────────────────────────────

/// `[wash]` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WashConfig {
    /// Calibration record that defines the wash area.
    #[serde(default = "default_calibration_label")]
    pub calibration_label: String,

    /// Optional parking record visited after the final homing.
    #[serde(default)]
    pub park_label: Option<String>,
}

impl WashConfig {
    /// Validate the wash configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.calibration_label.trim().is_empty() {
            return Err("wash.calibration_label cannot be empty".to_string());
        }
        if matches!(&self.park_label, Some(label) if label.trim().is_empty()) {
            return Err("wash.park_label cannot be empty when set".to_string());
        }
        Ok(())
    }
}

impl Default for WashConfig {
    fn default() -> Self {
        Self {
            calibration_label: default_calibration_label(),
            park_label: None,
        }
    }
}
