// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic refresh scheduling.
//!
//! [`AsyncPoller`] fires an action immediately on `start` and then on a fixed
//! cadence of at least [`MIN_POLL_INTERVAL`]. The timer runs as a task on the
//! runtime handed to the constructor, so tests can drive it with a paused
//! clock. There is no stop operation: `reset` discards the pending tick and
//! re-arms, and dropping the poller cancels its timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Floor applied to every requested polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Ceiling applied to every requested polling interval, so arming a timer
/// never overflows the clock.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(u32::MAX as u64);

type Action = Arc<dyn Fn() + Send + Sync + 'static>;

/// Lifecycle state of an [`AsyncPoller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// No action has been started yet.
    Idle,
    /// A timer is armed for the stored action.
    Running,
}

struct Inner {
    /// Last action handed to `start`.
    action: Option<Action>,
    /// Timer task producing ticks for `action`.
    timer: Option<JoinHandle<()>>,
    /// Bumped on every re-arm; a timer only fires while its generation is current.
    generation: u64,
}

/// Repeats an action on a clamped interval.
pub struct AsyncPoller {
    interval: Duration,
    runtime: Handle,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for AsyncPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPoller")
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish()
    }
}

impl AsyncPoller {
    /// Creates an idle poller whose ticks run on `runtime`.
    ///
    /// Intervals below 60 seconds, including zero and negative values, are
    /// raised to 60 seconds. Intervals above [`MAX_POLL_INTERVAL`] are
    /// lowered to it.
    pub fn new(requested_interval_seconds: i64, runtime: Handle) -> Self {
        Self {
            interval: effective_interval(requested_interval_seconds),
            runtime,
            inner: Arc::new(Mutex::new(Inner {
                action: None,
                timer: None,
                generation: 0,
            })),
        }
    }

    /// Creates an idle poller on the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn with_current_runtime(requested_interval_seconds: i64) -> Self {
        Self::new(requested_interval_seconds, Handle::current())
    }

    /// The clamped interval between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a timer is currently armed.
    pub fn state(&self) -> PollerState {
        if lock(&self.inner).timer.is_some() {
            PollerState::Running
        } else {
            PollerState::Idle
        }
    }

    /// Stores `action`, runs it once right away and then every interval.
    ///
    /// Starting a running poller replaces its action and timer, so the new
    /// action fires now and then one interval later.
    pub fn start<F>(&self, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let action: Action = Arc::new(action);
        {
            let mut inner = lock(&self.inner);
            inner.action = Some(Arc::clone(&action));
            self.arm(&mut inner);
        }
        debug!(interval = ?self.interval, "remote-config poller started");
        action();
    }

    /// Discards the pending tick and re-arms the timer.
    ///
    /// The stored action is not run; the next tick happens one full interval
    /// from now. A tick already running is left to finish. Without a prior
    /// `start` this does nothing.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        if inner.action.is_none() {
            debug!("remote-config poller reset before start; nothing to re-arm");
            return;
        }
        self.arm(&mut inner);
        debug!(interval = ?self.interval, "remote-config poller reset");
    }

    /// Cancels the current timer and spawns a new one for the stored action.
    fn arm(&self, inner: &mut Inner) {
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        let Some(action) = inner.action.clone() else {
            return;
        };

        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        let shared = Arc::clone(&self.inner);
        let period = self.interval;
        let first_tick = Instant::now() + period;

        inner.timer = Some(self.runtime.spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            // Keep the cadence anchored to the nominal tick times.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                ticker.tick().await;
                if lock(&shared).generation != generation {
                    break;
                }
                debug!("remote-config poller tick");
                action();
            }
        }));
    }
}

impl Drop for AsyncPoller {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.inner).timer.take() {
            timer.abort();
        }
    }
}

/// `max(requested, 60s)`, capped at [`MAX_POLL_INTERVAL`].
fn effective_interval(requested_seconds: i64) -> Duration {
    let floor = MIN_POLL_INTERVAL.as_secs();
    let ceiling = MAX_POLL_INTERVAL.as_secs();
    let seconds = u64::try_from(requested_seconds)
        .unwrap_or(0)
        .clamp(floor, ceiling);
    Duration::from_secs(seconds)
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
