//! Cancellable periodic polling.
//!
//! # Responsibilities
//! - Run one tick inline on start so callers see fresh state immediately
//! - Schedule further ticks at a fixed period on a background task
//! - Stop on request without interrupting a tick that is already running

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::Shutdown;

/// Why a tick is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The synchronous tick performed by `start`.
    Immediate,
    /// A tick fired by the background schedule.
    Scheduled,
}

/// Work performed on each tick.
pub type TickFn = Arc<dyn Fn(Tick) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle to a running poller. Dropping the handle stops the poller.
pub struct HealthPoller {
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
    period: Option<Duration>,
}

impl HealthPoller {
    /// Run `tick` once inline, then every `period` on a background task.
    ///
    /// `period` is resolved after the inline tick so it can depend on the state
    /// that tick produced. `None` means no further ticks are scheduled.
    pub async fn start(tick: TickFn, period: impl FnOnce() -> Option<Duration>) -> Self {
        tick(Tick::Immediate).await;

        let period = period();
        let shutdown = Shutdown::new();
        let task = period.map(|period| {
            let stop = shutdown.subscribe();
            tokio::spawn(run(period, tick, stop))
        });

        if let Some(period) = period {
            tracing::debug!(period_ms = period.as_millis() as u64, "Health poller scheduled");
        }

        Self {
            shutdown,
            task,
            period,
        }
    }

    /// Cancel the next scheduled tick. Returns immediately; a tick already in
    /// flight runs to completion and the task exits afterwards.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Scheduled period, or `None` if only the inline tick ran.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// True while the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

impl std::fmt::Debug for HealthPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthPoller")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run(period: Duration, tick: TickFn, mut stop: broadcast::Receiver<()>) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.recv() => {
                tracing::debug!("Health poller stopped");
                break;
            }
            _ = ticker.tick() => {
                tick(Tick::Scheduled).await;
            }
        }
    }
}
