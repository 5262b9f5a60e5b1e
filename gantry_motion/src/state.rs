//! State shared between the execution contexts.
//!
//! One `SharedMotionState` lives behind an `Arc` and is reached from:
//! - the operator / sequencer context (commands, blocking waits)
//! - the scheduler thread (sole writer of positions)
//! - the endstop sensor contexts (edge handlers)
//!
//! Everything in here is either an atomic with sequentially consistent
//! ordering or guarded by a short `parking_lot` lock.

use crate::backoff::BackoffController;
use crate::endstop::{EdgeReaction, EndstopMonitor};
use crate::intent::IntentRegister;
use crate::scheduler::{RequestQueue, SchedulerRequest, SchedulerStats};
use gantry_common::consts::AXIS_COUNT;
use gantry_common::hal::driver::HalError;
use gantry_common::hal::types::{Axis, Direction, EndstopEdge};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Shared motion state.
#[derive(Debug)]
pub struct SharedMotionState {
    /// Desired motion of both axes.
    pub register: IntentRegister,
    /// Endstop flags.
    pub endstops: EndstopMonitor,
    /// Back-off request queue.
    pub backoff: BackoffController,
    /// Requests served by the scheduler thread.
    pub requests: RequestQueue,
    positions: [AtomicI64; AXIS_COUNT],
    referenced: AtomicBool,
    running: Arc<AtomicBool>,
    fault: Mutex<Option<(Axis, HalError)>>,
    stats: Mutex<SchedulerStats>,
}

impl SharedMotionState {
    /// Create the state for the given limit directions (X, Y) and back-off
    /// duration.
    pub fn new(limit_directions: [Direction; AXIS_COUNT], backoff_duration: Duration) -> Self {
        Self {
            register: IntentRegister::new(),
            endstops: EndstopMonitor::new(limit_directions),
            backoff: BackoffController::new(backoff_duration),
            requests: RequestQueue::default(),
            positions: Default::default(),
            referenced: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            fault: Mutex::new(None),
            stats: Mutex::new(SchedulerStats::default()),
        }
    }

    /// Edge handler entry point for the sensor of `axis`.
    pub fn on_edge(&self, axis: Axis, edge: EndstopEdge) -> EdgeReaction {
        self.endstops
            .on_edge(axis, edge, &self.register, &self.backoff)
    }

    // ─── Positions (written by the scheduler only) ──────────────────

    /// Position counter of `axis` [steps].
    #[inline]
    pub fn position(&self, axis: Axis) -> i64 {
        self.positions[axis.index()].load(Ordering::SeqCst)
    }

    /// Both position counters.
    pub fn positions(&self) -> [i64; AXIS_COUNT] {
        Axis::ALL.map(|axis| self.position(axis))
    }

    pub(crate) fn add_position(&self, axis: Axis, delta: i64) {
        self.positions[axis.index()].fetch_add(delta, Ordering::SeqCst);
    }

    pub(crate) fn zero_positions(&self) {
        for position in &self.positions {
            position.store(0, Ordering::SeqCst);
        }
    }

    // ─── Reference ──────────────────────────────────────────────────

    /// Whether the counters refer to the homed zero.
    pub fn is_referenced(&self) -> bool {
        self.referenced.load(Ordering::SeqCst)
    }

    pub(crate) fn set_referenced(&self, referenced: bool) {
        self.referenced.store(referenced, Ordering::SeqCst);
    }

    // ─── Scheduler liveness ─────────────────────────────────────────

    /// Running flag of the scheduler loop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Whether the scheduler loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Submit a request and block until the scheduler served it.
    ///
    /// Returns false if the scheduler stopped or `timeout` elapsed first.
    /// An abandoned request is withdrawn so it is never served afterwards.
    pub fn submit_and_wait(&self, request: SchedulerRequest, poll: Duration, timeout: Duration) -> bool {
        let ticket = self.requests.submit(request);
        let deadline = Instant::now() + timeout;
        while !self.requests.is_served(ticket) {
            if !self.is_running() || Instant::now() >= deadline {
                if self.requests.withdraw(ticket) {
                    return false;
                }
                // Already drained: the scheduler finishes it within the current tick.
                return self.wait_in_flight(ticket, poll);
            }
            std::thread::sleep(poll);
        }
        true
    }

    fn wait_in_flight(&self, ticket: u64, poll: Duration) -> bool {
        while !self.requests.is_served(ticket) {
            if !self.is_running() {
                return self.requests.is_served(ticket);
            }
            std::thread::sleep(poll);
        }
        true
    }

    // ─── Faults and statistics ──────────────────────────────────────

    pub(crate) fn record_fault(&self, axis: Axis, error: HalError) {
        *self.fault.lock() = Some((axis, error));
    }

    /// Take the last step failure reported by the scheduler.
    pub fn take_fault(&self) -> Option<(Axis, HalError)> {
        self.fault.lock().take()
    }

    pub(crate) fn publish_stats(&self, stats: SchedulerStats) {
        *self.stats.lock() = stats;
    }

    /// Tick statistics last published by the scheduler.
    pub fn stats(&self) -> SchedulerStats {
        *self.stats.lock()
    }
}
