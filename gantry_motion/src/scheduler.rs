//! Motion scheduler.
//!
//! The scheduler owns both axis drivers and is the only caller of
//! `AxisDriver::step` and the only writer of the position counters.
//!
//! # Tick
//!
//! 1. Serve queued requests (zero positions, disable drivers)
//! 2. Start new back-off tasks and advance running ones (a task issues its
//!    away intent once; a later stop cancels the motion, not the task)
//! 3. Snapshot the intent register; for each axis with work:
//!    - endstop pressed and direction toward the limit: suppress the burst
//!      (a `StepOnce` is still consumed, `Continuous` is kept)
//!    - otherwise emit one bounded burst and add the signed count to the
//!      position only after the driver confirmed it
//!
//! [`MotionScheduler::run`] repeats the tick until the running flag drops,
//! sleeping `idle_interval` whenever nothing is pending.

use crate::backoff::{BackoffAction, BackoffTask};
use crate::state::SharedMotionState;
use gantry_common::consts::AXIS_COUNT;
use gantry_common::hal::config::MachineConfig;
use gantry_common::hal::driver::AxisDriver;
use gantry_common::hal::types::{Axis, Direction};
use gantry_common::motion::command::{MotionCommand, MotionIntent};
use gantry_common::motion::config::MotionConfig;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

// ─── Requests ───────────────────────────────────────────────────────

/// Work that must run on the scheduler thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerRequest {
    /// Reset both position counters to zero.
    ZeroPositions,
    /// De-energise both drivers.
    DisableDrivers,
}

/// Ticketed request queue. Tickets are served in submission order.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: Mutex<(u64, Vec<(u64, SchedulerRequest)>)>,
    served: AtomicU64,
}

impl RequestQueue {
    /// Enqueue `request` and return its ticket.
    pub fn submit(&self, request: SchedulerRequest) -> u64 {
        let mut pending = self.pending.lock();
        pending.0 += 1;
        let ticket = pending.0;
        pending.1.push((ticket, request));
        ticket
    }

    /// Whether the request with `ticket` has been served.
    pub fn is_served(&self, ticket: u64) -> bool {
        self.served.load(Ordering::SeqCst) >= ticket
    }

    /// Remove a request that has not been picked up yet.
    ///
    /// Returns false if the scheduler already took it.
    pub fn withdraw(&self, ticket: u64) -> bool {
        let mut pending = self.pending.lock();
        let before = pending.1.len();
        pending.1.retain(|(queued, _)| *queued != ticket);
        pending.1.len() != before
    }

    fn drain(&self) -> Vec<(u64, SchedulerRequest)> {
        std::mem::take(&mut self.pending.lock().1)
    }

    fn mark_served(&self, ticket: u64) {
        self.served.fetch_max(ticket, Ordering::SeqCst);
    }
}

// ─── Statistics ─────────────────────────────────────────────────────

/// Tick statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Ticks that emitted at least one burst.
    pub bursts: u64,
    /// Bursts withheld because the axis was pressed toward its limit.
    pub suppressed_bursts: u64,
    /// Bursts the driver reported as failed.
    pub step_failures: u64,
    /// Ticks longer than the latency budget.
    pub overruns: u64,
    /// Longest tick [µs].
    pub max_tick_us: u64,
    /// Sum of tick durations [µs].
    pub total_tick_us: u64,
}

impl SchedulerStats {
    /// Mean tick duration [µs].
    pub fn avg_tick_us(&self) -> u64 {
        if self.ticks == 0 {
            0
        } else {
            self.total_tick_us / self.ticks
        }
    }
}

// ─── Scheduler ──────────────────────────────────────────────────────

/// The single thread driving the axes.
pub struct MotionScheduler {
    shared: Arc<SharedMotionState>,
    drivers: [Box<dyn AxisDriver>; AXIS_COUNT],
    limit: [Direction; AXIS_COUNT],
    burst_steps: u32,
    idle_interval: Duration,
    max_tick_latency: Duration,
    backoffs: [Option<BackoffTask>; AXIS_COUNT],
    /// Register revision left by each back-off's drive command.
    backoff_revisions: [u64; AXIS_COUNT],
    stats: SchedulerStats,
}

impl MotionScheduler {
    /// Create a scheduler over the drivers of X and Y.
    pub fn new(
        shared: Arc<SharedMotionState>,
        drivers: [Box<dyn AxisDriver>; AXIS_COUNT],
        machine: &MachineConfig,
        motion: &MotionConfig,
    ) -> Self {
        Self {
            shared,
            drivers,
            limit: Axis::ALL.map(|axis| machine.axis(axis).limit_direction),
            burst_steps: motion.burst_steps,
            idle_interval: motion.idle_interval(),
            max_tick_latency: motion.max_tick_latency(),
            backoffs: [None, None],
            backoff_revisions: [0; AXIS_COUNT],
            stats: SchedulerStats::default(),
        }
    }

    /// Driver of `axis`.
    pub fn driver(&self, axis: Axis) -> &dyn AxisDriver {
        self.drivers[axis.index()].as_ref()
    }

    /// Tick statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Whether a back-off of `axis` is being driven.
    pub fn backoff_running(&self, axis: Axis) -> bool {
        self.backoffs[axis.index()].is_some()
    }

    /// Execute one tick; `dt` is the time since the previous tick.
    ///
    /// Returns true if anything is still pending (motion or back-off), in
    /// which case the loop does not sleep.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.stats.ticks += 1;
        self.serve_requests();
        self.advance_backoffs(dt);

        let snapshot = self.shared.register.snapshot();
        let mut emitted = false;
        for axis in Axis::ALL {
            let intent = snapshot.intent(axis);
            let Some(direction) = intent.direction() else {
                continue;
            };
            let revision = snapshot.revision(axis);

            if self.shared.endstops.is_pressed(axis) && direction == self.limit[axis.index()] {
                self.stats.suppressed_bursts += 1;
                trace!("Axis {} inhibited toward its limit", axis);
                if matches!(intent, MotionIntent::StepOnce(_)) {
                    self.shared.register.settle(axis, revision, 0);
                }
                continue;
            }

            let count = match intent {
                MotionIntent::Travel { remaining, .. } => {
                    remaining.min(u64::from(self.burst_steps)) as u32
                }
                _ => self.burst_steps,
            };

            match self.drivers[axis.index()].step(direction, count) {
                Ok(()) => {
                    self.shared
                        .add_position(axis, direction.sign() * i64::from(count));
                    self.shared.register.settle(axis, revision, u64::from(count));
                    emitted = true;
                }
                Err(e) => {
                    self.stats.step_failures += 1;
                    if self.stats.step_failures <= 10 || self.stats.step_failures % 1000 == 0 {
                        warn!(
                            "Axis {} burst failed (#{}): {}",
                            axis, self.stats.step_failures, e
                        );
                    }
                    // The axis stays stopped until commanded again.
                    self.shared.record_fault(axis, e);
                    self.shared.register.apply(MotionCommand::StopAxis(axis));
                }
            }
        }
        if emitted {
            self.stats.bursts += 1;
        }

        self.shared.register.snapshot().has_work() || self.backoffs.iter().any(Option::is_some)
    }

    fn serve_requests(&mut self) {
        for (ticket, request) in self.shared.requests.drain() {
            match request {
                SchedulerRequest::ZeroPositions => {
                    self.shared.zero_positions();
                    info!("Position counters reset to zero");
                }
                SchedulerRequest::DisableDrivers => self.disable_all(),
            }
            self.shared.requests.mark_served(ticket);
        }
    }

    fn advance_backoffs(&mut self, dt: Duration) {
        for request in self.shared.backoff.drain_requests() {
            let slot = &mut self.backoffs[request.axis.index()];
            if slot.is_some() {
                warn!("Back-off of axis {} already running, request dropped", request.axis);
                continue;
            }
            info!(
                "Back-off of axis {} started ({:?} for {} ms)",
                request.axis,
                request.away,
                self.shared.backoff.duration().as_millis()
            );
            *slot = Some(self.shared.backoff.start_task(request));
        }

        for axis in Axis::ALL {
            let Some(task) = self.backoffs[axis.index()].as_mut() else {
                continue;
            };
            match task.advance(dt) {
                BackoffAction::Drive(command) => {
                    self.backoff_revisions[axis.index()] =
                        self.shared.register.apply_tracked(axis, command);
                }
                BackoffAction::Hold => {}
                BackoffAction::Finish => {
                    self.shared.endstops.finish_backoff(axis);
                    if !self
                        .shared
                        .register
                        .stop_if_current(axis, self.backoff_revisions[axis.index()])
                    {
                        debug!("Back-off of axis {} was overridden before it finished", axis);
                    }
                    self.shared.backoff.record_completion();
                    self.backoffs[axis.index()] = None;
                    info!("Back-off of axis {} finished", axis);
                }
            }
        }
    }

    /// De-energise both drivers.
    pub fn disable_all(&mut self) {
        for axis in Axis::ALL {
            if let Err(e) = self.drivers[axis.index()].disable() {
                warn!("Failed to disable axis {}: {}", axis, e);
            }
        }
        debug!("Drivers disabled");
    }

    /// Run ticks until `running` is cleared, then stop and disable.
    ///
    /// Returns the scheduler so the drivers survive a restart.
    pub fn run(mut self, running: &AtomicBool) -> Self {
        info!(
            "Motion scheduler started (burst={} steps, idle={}ms)",
            self.burst_steps,
            self.idle_interval.as_millis()
        );
        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let mut last_tick = Instant::now();
        while running.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            let dt = tick_start.duration_since(last_tick);
            last_tick = tick_start;

            let pending = self.tick(dt);

            let tick_us = tick_start.elapsed().as_micros() as u64;
            self.stats.total_tick_us += tick_us;
            self.stats.max_tick_us = self.stats.max_tick_us.max(tick_us);
            if tick_us > self.max_tick_latency.as_micros() as u64 {
                self.stats.overruns += 1;
                if self.stats.overruns <= 10 || self.stats.overruns % 1000 == 0 {
                    warn!(
                        "Tick overrun #{}: {}us (budget {}us)",
                        self.stats.overruns,
                        tick_us,
                        self.max_tick_latency.as_micros()
                    );
                }
            }
            self.shared.publish_stats(self.stats);

            if self.stats.ticks % 1000 == 0 {
                debug!(
                    "Scheduler: {} ticks, avg={}us, max={}us, overruns={}",
                    self.stats.ticks,
                    self.stats.avg_tick_us(),
                    self.stats.max_tick_us,
                    self.stats.overruns
                );
            }

            if !pending {
                std::thread::sleep(self.idle_interval);
            }
        }

        self.shared.register.apply(MotionCommand::StopAll);
        self.serve_requests();
        self.disable_all();
        info!(
            "Motion scheduler stopped after {} ticks (overruns: {})",
            self.stats.ticks, self.stats.overruns
        );
        self
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling thread.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
