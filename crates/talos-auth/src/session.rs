//! Idle-session countdown and the actor task that owns it.
//!
//! The countdown is mutated only inside one task, fed by its own one-second
//! interval and by [`SessionSignal`] messages, so ticks and activity resets are
//! serialized by construction.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::SessionMode;

/// Idle budget applied when none is configured.
pub const DEFAULT_IDLE_BUDGET: Duration = Duration::from_secs(900);

/// Countdown resolution.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Snapshot published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// Current mode.
    pub mode: SessionMode,
    /// Seconds left before idle expiry (zero outside the active mode).
    pub remaining_seconds: i64,
}

impl SessionState {
    /// State for modes without a running countdown.
    pub fn inactive(mode: SessionMode) -> Self {
        Self {
            mode,
            remaining_seconds: 0,
        }
    }
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting; seconds remaining.
    Running(i64),
    /// Budget exhausted on this tick. Reported exactly once.
    Expired,
    /// Already expired earlier; nothing to do.
    Finished,
}

/// Pure idle countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCountdown {
    budget: i64,
    remaining: i64,
    fired: bool,
}

impl SessionCountdown {
    /// Creates a countdown with `budget_secs` remaining.
    pub fn new(budget_secs: u64) -> Self {
        let budget = i64::try_from(budget_secs).unwrap_or(i64::MAX);
        Self {
            budget,
            remaining: budget,
            fired: false,
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Full budget in seconds.
    pub fn budget(&self) -> i64 {
        self.budget
    }

    /// Returns `true` once expiry was reported.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Advances one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.fired {
            return TickOutcome::Finished;
        }

        self.remaining -= 1;
        if self.remaining <= 0 {
            self.remaining = 0;
            self.fired = true;
            return TickOutcome::Expired;
        }

        TickOutcome::Running(self.remaining)
    }

    /// Restores the full budget. Ignored after expiry.
    pub fn reset(&mut self) {
        if !self.fired {
            self.remaining = self.budget;
        }
    }
}

/// Messages accepted by the countdown task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// One second elapsed.
    Tick,
    /// User activity; reset to the full budget.
    Activity,
    /// Tear down without firing.
    Stop,
}

/// Cloneable sender for activity signals.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    signals: mpsc::UnboundedSender<SessionSignal>,
}

impl ActivityHandle {
    /// Reports user activity. No-op once the timer has stopped.
    pub fn record(&self) {
        let _ = self.signals.send(SessionSignal::Activity);
    }
}

/// Running idle timer for one active session.
///
/// Dropping the timer aborts its task.
#[derive(Debug)]
pub struct SessionTimer {
    signals: mpsc::UnboundedSender<SessionSignal>,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl SessionTimer {
    /// Spawns the countdown task on the current tokio runtime.
    ///
    /// `on_expire` runs at most once, when the budget is exhausted; the task
    /// ends right after it completes.
    pub fn start<F, Fut>(budget: Duration, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let countdown = SessionCountdown::new(budget.as_secs().max(1));
        let (signals, receiver) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SessionState {
            mode: SessionMode::Active,
            remaining_seconds: countdown.remaining(),
        });

        let task = tokio::spawn(run_countdown(countdown, receiver, state_tx, on_expire));
        Self {
            signals,
            state,
            task,
        }
    }

    /// Returns a handle for activity listeners.
    pub fn activity_handle(&self) -> ActivityHandle {
        ActivityHandle {
            signals: self.signals.clone(),
        }
    }

    /// Reports user activity.
    pub fn record_activity(&self) {
        let _ = self.signals.send(SessionSignal::Activity);
    }

    /// Injects one tick in addition to the task's own interval.
    pub fn tick(&self) {
        let _ = self.signals.send(SessionSignal::Tick);
    }

    /// Stops the countdown without firing.
    pub fn stop(&self) {
        let _ = self.signals.send(SessionSignal::Stop);
    }

    /// Subscribes to countdown updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Returns the latest published state.
    pub fn snapshot(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns `true` once the task has ended (expired or stopped).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_countdown<F, Fut>(
    mut countdown: SessionCountdown,
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    state: watch::Sender<SessionState>,
    on_expire: F,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let publish = |remaining_seconds: i64| {
        state.send_replace(SessionState {
            mode: SessionMode::Active,
            remaining_seconds,
        });
    };

    loop {
        let signal = tokio::select! {
            _ = ticker.tick() => SessionSignal::Tick,
            received = signals.recv() => received.unwrap_or(SessionSignal::Stop),
        };

        match signal {
            SessionSignal::Tick => match countdown.tick() {
                TickOutcome::Running(remaining) => publish(remaining),
                TickOutcome::Expired => {
                    publish(0);
                    info!("idle session expired");
                    on_expire().await;
                    return;
                }
                TickOutcome::Finished => return,
            },
            SessionSignal::Activity => {
                countdown.reset();
                publish(countdown.remaining());
            }
            SessionSignal::Stop => {
                debug!("session timer stopped");
                return;
            }
        }
    }
}
