//! System-wide constants for the gantry workspace.
//!
//! Single source of truth for axis counts, timing defaults and default paths.
//! Imported by all crates; values are not duplicated elsewhere.

/// Number of independently driven axes (X and Y).
pub const AXIS_COUNT: usize = 2;

/// Micro-steps emitted per scheduler burst.
pub const DEFAULT_BURST_STEPS: u32 = 20;

/// Half period of one step pulse [µs].
pub const DEFAULT_STEP_DELAY_US: u64 = 50;

/// Scheduler sleep when no axis has pending work [ms].
pub const DEFAULT_IDLE_INTERVAL_MS: u64 = 10;

/// Tick latency above which the scheduler reports an overrun [ms].
pub const DEFAULT_MAX_TICK_LATENCY_MS: u64 = 10;

/// Duration of the automatic back-off away from a pressed endstop [ms].
pub const DEFAULT_BACKOFF_DURATION_MS: u64 = 300;

/// Poll period of blocking calls (`home`, `move_to`) [ms].
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2;

/// Endstop debounce interval [ms].
pub const DEFAULT_DEBOUNCE_MS: u64 = 10;

/// Endstop polling period [µs].
pub const DEFAULT_ENDSTOP_POLL_US: u64 = 1000;

/// Per-phase homing timeout [ms].
pub const DEFAULT_HOMING_TIMEOUT_MS: u64 = 30_000;

/// Maximum travel during one homing approach [steps].
pub const DEFAULT_HOMING_MAX_TRAVEL_STEPS: u64 = 400_000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gantry/gantry.toml";

/// Default calibration record directory.
pub const DEFAULT_CALIBRATION_DIR: &str = "/var/lib/gantry/calibration";

/// Default work-cycle log path.
pub const DEFAULT_CYCLE_LOG: &str = "/var/lib/gantry/wash_log.jsonl";

/// Calibration label read at the start of every wash cycle.
pub const DEFAULT_CALIBRATION_LABEL: &str = "default";

/// Default baud rate of the peripheral serial link.
pub const DEFAULT_PERIPHERAL_BAUD: u32 = 9600;

/// Delay after opening the peripheral port (the controller resets on connect) [ms].
pub const DEFAULT_PERIPHERAL_SETTLE_MS: u64 = 2000;

/// Window during which peripheral response lines are collected [ms].
pub const DEFAULT_RESPONSE_WINDOW_MS: u64 = 500;
