//! Debounced endstop sensor.
//!
//! A limit switch is read through a [`RawInput`] (one digital level) and
//! turned into debounced [`EndstopEdge`] events:
//!
//! - [`Debouncer`] - Pure debounce filter, driven by explicit timestamps
//! - [`PolledEndstop`] - Samples a `RawInput` on its own thread and delivers
//!   edges to the installed handler (interrupt-style)
//!
//! The polarity is configurable (`active_high`) because the pull wiring of
//! the switches differs between installations.
//!
//! The initial debounced state is "released". A switch that is already
//! closed when sampling starts therefore produces a `Pressed` edge after one
//! debounce interval.

use gantry_common::hal::config::EndstopConfig;
use gantry_common::hal::driver::{EdgeHandler, EndstopSensor, HalError};
use gantry_common::hal::types::{Axis, EndstopEdge};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One digital input level.
pub trait RawInput: Send + 'static {
    /// Current raw level (`true` = high).
    fn read(&self) -> Result<bool, HalError>;
}

/// Debounce filter for one switch.
///
/// A level change is reported only after it was observed continuously for
/// at least the debounce interval; shorter glitches are discarded.
#[derive(Debug, Clone)]
pub struct Debouncer {
    active_high: bool,
    debounce: Duration,
    pressed: bool,
    candidate: Option<(bool, Instant)>,
}

impl Debouncer {
    /// Create a filter in the released state.
    pub fn new(active_high: bool, debounce: Duration) -> Self {
        Self {
            active_high,
            debounce,
            pressed: false,
            candidate: None,
        }
    }

    /// Debounced state.
    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed one raw sample taken at `now`.
    ///
    /// Returns the edge when a stable transition completes.
    pub fn update(&mut self, raw_level: bool, now: Instant) -> Option<EndstopEdge> {
        let active = raw_level == self.active_high;
        if active == self.pressed {
            self.candidate = None;
            return None;
        }

        let since = match self.candidate {
            Some((level, since)) if level == active => since,
            _ => {
                self.candidate = Some((active, now));
                now
            }
        };

        if now.saturating_duration_since(since) < self.debounce {
            return None;
        }

        self.pressed = active;
        self.candidate = None;
        Some(if active {
            EndstopEdge::Pressed
        } else {
            EndstopEdge::Released
        })
    }
}

/// Endstop sensor sampling a [`RawInput`] on a dedicated thread.
///
/// Edge detection starts when a handler is installed with
/// [`EndstopSensor::on_edge`]; the handler runs on the sampling thread.
pub struct PolledEndstop {
    axis: Axis,
    config: EndstopConfig,
    input: Option<Box<dyn RawInput>>,
    pressed: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Box<dyn RawInput>>>,
}

impl PolledEndstop {
    /// Wrap `input` as the endstop of `axis`.
    pub fn new(axis: Axis, input: Box<dyn RawInput>, config: EndstopConfig) -> Self {
        Self {
            axis,
            config,
            input: Some(input),
            pressed: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn stop_worker(&mut self) -> Result<(), HalError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let input = worker.join().map_err(|_| {
                HalError::CommunicationError(format!("endstop {} sampling thread panicked", self.axis))
            })?;
            self.input = Some(input);
        }
        Ok(())
    }
}

impl EndstopSensor for PolledEndstop {
    fn on_edge(&mut self, handler: EdgeHandler) -> Result<(), HalError> {
        self.stop_worker()?;
        let input = self.input.take().ok_or_else(|| {
            HalError::InitFailed(format!("endstop {} input unavailable", self.axis))
        })?;

        let axis = self.axis;
        let active_high = self.config.active_high;
        let debounce = self.config.debounce();
        let poll = self.config.poll_interval();
        let pressed = Arc::clone(&self.pressed);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let worker = std::thread::Builder::new()
            .name(format!("endstop-{axis}"))
            .spawn(move || {
                let mut debouncer = Debouncer::new(active_high, debounce);
                let mut read_errors: u64 = 0;
                while running.load(Ordering::SeqCst) {
                    match input.read() {
                        Ok(level) => {
                            if let Some(edge) = debouncer.update(level, Instant::now()) {
                                pressed.store(edge == EndstopEdge::Pressed, Ordering::SeqCst);
                                debug!("Endstop {}: {:?}", axis, edge);
                                handler(edge);
                            }
                        }
                        Err(e) => {
                            read_errors += 1;
                            if read_errors <= 10 || read_errors % 1000 == 0 {
                                warn!("Endstop {} read error #{}: {}", axis, read_errors, e);
                            }
                        }
                    }
                    std::thread::sleep(poll);
                }
                input
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HalError::InitFailed(format!("endstop {axis} sampling thread: {e}"))
            })?;

        self.worker = Some(worker);
        info!(
            "Endstop {} armed (active_high={}, debounce={}ms)",
            self.axis, self.config.active_high, self.config.debounce_ms
        );
        Ok(())
    }

    fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }

    fn close(&mut self) -> Result<(), HalError> {
        self.stop_worker()
    }
}

impl Drop for PolledEndstop {
    fn drop(&mut self) {
        if let Err(e) = self.stop_worker() {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const DEBOUNCE: Duration = Duration::from_millis(10);

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn glitch_shorter_than_debounce_is_discarded() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(true, DEBOUNCE);

        assert_eq!(d.update(true, at(t0, 0)), None);
        assert_eq!(d.update(true, at(t0, 5)), None);
        assert_eq!(d.update(false, at(t0, 8)), None);
        assert_eq!(d.update(false, at(t0, 30)), None);
        assert!(!d.is_pressed());
    }

    #[test]
    fn stable_transition_produces_one_edge() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(true, DEBOUNCE);

        assert_eq!(d.update(true, at(t0, 0)), None);
        assert_eq!(d.update(true, at(t0, 10)), Some(EndstopEdge::Pressed));
        assert_eq!(d.update(true, at(t0, 20)), None);
        assert!(d.is_pressed());

        assert_eq!(d.update(false, at(t0, 30)), None);
        assert_eq!(d.update(false, at(t0, 45)), Some(EndstopEdge::Released));
    }

    #[test]
    fn bouncing_restarts_the_interval() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(true, DEBOUNCE);

        d.update(true, at(t0, 0));
        d.update(false, at(t0, 6));
        assert_eq!(d.update(true, at(t0, 9)), None);
        assert_eq!(d.update(true, at(t0, 15)), None);
        assert_eq!(d.update(true, at(t0, 19)), Some(EndstopEdge::Pressed));
    }

    #[test]
    fn active_low_polarity() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(false, Duration::ZERO);

        assert_eq!(d.update(true, t0), None);
        assert_eq!(d.update(false, t0), Some(EndstopEdge::Pressed));
        assert_eq!(d.update(true, t0), Some(EndstopEdge::Released));
    }

    struct SharedLevel(Arc<AtomicBool>);

    impl RawInput for SharedLevel {
        fn read(&self) -> Result<bool, HalError> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    #[test]
    fn polled_endstop_delivers_edges() {
        let level = Arc::new(AtomicBool::new(false));
        let config = EndstopConfig {
            active_high: true,
            debounce_ms: 2,
            poll_interval_us: 200,
        };
        let mut endstop = PolledEndstop::new(Axis::X, Box::new(SharedLevel(Arc::clone(&level))), config);

        let edges = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&edges);
        endstop
            .on_edge(Box::new(move |edge| sink.lock().push(edge)))
            .unwrap();

        level.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !endstop.is_pressed() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(endstop.is_pressed());

        level.store(false, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(2);
        while endstop.is_pressed() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        endstop.close().unwrap();

        assert_eq!(
            *edges.lock(),
            vec![EndstopEdge::Pressed, EndstopEdge::Released]
        );
    }

    #[test]
    fn handler_can_be_replaced() {
        let level = Arc::new(AtomicBool::new(false));
        let mut endstop = PolledEndstop::new(
            Axis::Y,
            Box::new(SharedLevel(Arc::clone(&level))),
            EndstopConfig::default(),
        );
        endstop.on_edge(Box::new(|_| {})).unwrap();
        endstop.on_edge(Box::new(|_| {})).unwrap();
        endstop.close().unwrap();
        endstop.close().unwrap();
    }
}
