//! Countdown Timer
//!
//! One cancellable per-second ticker per session. Each run is tagged with a
//! [`RunId`]; signals are delivered over a channel and the receiver drops
//! any signal whose run is no longer current. That check, made under the
//! session gate, is what keeps a cancelled run from ever touching state.

use std::time::Duration;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::trace;

/// Seconds left when [`TimerEvent::Warning`] fires.
pub const WARNING_SECONDS: u32 = 5;
/// Seconds left when [`TimerEvent::Critical`] fires.
pub const CRITICAL_SECONDS: u32 = 3;
/// Seconds left when [`TimerEvent::Urgent`] fires.
pub const URGENT_SECONDS: u32 = 1;

/// Shortest accepted countdown step.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Identifies one countdown run. Increases with every start or cancel.
pub type RunId = u64;

/// Events emitted by a countdown run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    /// Seconds left in the run
    Tick(u32),
    /// Five seconds left
    Warning,
    /// Three seconds left
    Critical,
    /// One second left
    Urgent,
    /// Countdown reached zero
    Timeout,
}

impl TimerEvent {
    /// Alert that precedes the tick for `seconds_left`, if any.
    pub fn threshold(seconds_left: u32) -> Option<TimerEvent> {
        match seconds_left {
            WARNING_SECONDS => Some(TimerEvent::Warning),
            CRITICAL_SECONDS => Some(TimerEvent::Critical),
            URGENT_SECONDS => Some(TimerEvent::Urgent),
            _ => None,
        }
    }
}

/// A timer event tagged with the run that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSignal {
    /// Producing run
    pub run: RunId,
    /// Event payload
    pub event: TimerEvent,
}

/// Lifecycle of the most recent run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimerState {
    /// Never started
    #[default]
    Idle,
    /// Counting down
    Running,
    /// Stopped before reaching zero
    Cancelled,
    /// Reached zero and delivered its timeout
    Expired,
}

/// Single-run countdown timer.
///
/// `start` and `cancel` are plain `&mut self` methods; the session calls them
/// while holding its gate, so starting, cancelling and validating signals
/// are serialized with every other state mutation.
#[derive(Debug)]
pub struct CountdownTimer {
    run: RunId,
    state: TimerState,
    period: Duration,
    handle: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<TimerSignal>,
}

impl CountdownTimer {
    /// Create an idle timer and the receiver its signals arrive on.
    ///
    /// `period` is raised to [`MIN_PERIOD`] if shorter.
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<TimerSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = Self {
            run: 0,
            state: TimerState::Idle,
            period: period.max(MIN_PERIOD),
            handle: None,
            tx,
        };
        (timer, rx)
    }

    /// Start a countdown of `total_seconds`, replacing any running one.
    ///
    /// Emits `Tick(total_seconds)` immediately, then one tick per period down
    /// to `Tick(0)`, followed by `Timeout`. Must be called inside a tokio
    /// runtime.
    pub fn start(&mut self, total_seconds: u32) -> RunId {
        self.stop_task();
        self.run += 1;
        self.state = TimerState::Running;

        let run = self.run;
        let period = self.period;
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(run_countdown(run, total_seconds, period, tx)));

        trace!(run, total_seconds, "countdown started");
        run
    }

    /// Stop the current run. Safe to call in any state.
    pub fn cancel(&mut self) {
        self.stop_task();
        if self.state == TimerState::Running {
            self.run += 1;
            self.state = TimerState::Cancelled;
            trace!(run = self.run, "countdown cancelled");
        }
    }

    /// Whether `run` is the live run, i.e. its signals may be applied.
    #[inline]
    pub fn is_current(&self, run: RunId) -> bool {
        self.state == TimerState::Running && self.run == run
    }

    /// Record that `run` delivered its timeout. Returns false for stale runs.
    pub fn expire(&mut self, run: RunId) -> bool {
        if !self.is_current(run) {
            return false;
        }
        self.state = TimerState::Expired;
        self.handle = None;
        true
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Id of the latest run.
    pub fn run_id(&self) -> RunId {
        self.run
    }

    fn stop_task(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop_task();
    }
}

async fn run_countdown(
    run: RunId,
    total_seconds: u32,
    period: Duration,
    tx: mpsc::UnboundedSender<TimerSignal>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for seconds_left in (0..=total_seconds).rev() {
        // First tick completes immediately
        ticker.tick().await;

        if let Some(alert) = TimerEvent::threshold(seconds_left) {
            if tx.send(TimerSignal { run, event: alert }).is_err() {
                return;
            }
        }
        if tx.send(TimerSignal { run, event: TimerEvent::Tick(seconds_left) }).is_err() {
            return;
        }
    }

    let _ = tx.send(TimerSignal { run, event: TimerEvent::Timeout });
}
