//! Automatic back-off from a pressed endstop.
//!
//! The endstop edge handler only enqueues a [`BackoffRequest`]; the
//! scheduler drains the queue and advances one [`BackoffTask`] per axis
//! every tick. A task never touches a driver. It asks for motion through
//! the intent register like any other client, so the scheduler stays the
//! only writer of positions.
//!
//! Task lifecycle:
//! 1. First advance: drive away (`SetContinuous` in the away direction)
//! 2. Until the duration elapsed: hold. The away intent is issued once, so a
//!    `StopAll` or `StopAxis` from any context halts the axis at the next
//!    tick and the task only counts down
//! 3. Finish: the scheduler clears `pressed` and `backoff_active`, then
//!    stops the axis unless a newer command replaced the away intent

use gantry_common::hal::types::{Axis, Direction};
use gantry_common::motion::command::MotionCommand;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Request to drive `axis` away from its endstop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffRequest {
    /// Axis whose endstop was pressed.
    pub axis: Axis,
    /// Direction leading away from the switch.
    pub away: Direction,
}

/// Queue between the edge handlers and the scheduler.
#[derive(Debug)]
pub struct BackoffController {
    queue: Mutex<VecDeque<BackoffRequest>>,
    duration: Duration,
    started: AtomicU64,
    completed: AtomicU64,
}

impl BackoffController {
    /// Create a controller whose tasks drive away for `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            duration,
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Enqueue a back-off. Non-blocking; callable from an edge handler.
    pub fn request(&self, request: BackoffRequest) {
        debug!("Back-off requested for axis {}", request.axis);
        self.queue.lock().push_back(request);
    }

    /// Take every pending request, oldest first.
    pub fn drain_requests(&self) -> Vec<BackoffRequest> {
        self.queue.lock().drain(..).collect()
    }

    /// Create the task for a drained request.
    pub fn start_task(&self, request: BackoffRequest) -> BackoffTask {
        self.started.fetch_add(1, Ordering::SeqCst);
        BackoffTask::new(request, self.duration)
    }

    /// Record that a task finished.
    pub fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Configured drive-away duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Tasks started so far.
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Tasks finished so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}

/// What the scheduler must do for a task on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffAction {
    /// Start driving away: apply the command.
    Drive(MotionCommand),
    /// Nothing to apply this tick.
    Hold,
    /// Duration elapsed: clear the endstop flags and stop the axis.
    Finish,
}

/// One running back-off, advanced by the scheduler tick.
#[derive(Debug, Clone)]
pub struct BackoffTask {
    request: BackoffRequest,
    duration: Duration,
    elapsed: Duration,
    started: bool,
}

impl BackoffTask {
    /// Create a task that has not driven yet.
    pub fn new(request: BackoffRequest, duration: Duration) -> Self {
        Self {
            request,
            duration,
            elapsed: Duration::ZERO,
            started: false,
        }
    }

    /// Axis being backed off.
    #[inline]
    pub fn axis(&self) -> Axis {
        self.request.axis
    }

    /// Time spent driving away so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Advance by the tick period `dt`.
    ///
    /// The tick that starts the task does not count towards the duration.
    pub fn advance(&mut self, dt: Duration) -> BackoffAction {
        let BackoffRequest { axis, away } = self.request;
        if !self.started {
            self.started = true;
            return BackoffAction::Drive(MotionCommand::SetContinuous(axis, away));
        }
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            BackoffAction::Finish
        } else {
            BackoffAction::Hold
        }
    }
}
