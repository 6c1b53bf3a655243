//! Periodic loop scheduler.
//!
//! Each loop runs on its own cadence and observes a shared cancellation
//! token. A tick body returns a `Result`; the scheduler is the single place
//! where tick failures are handled, and its policy is to log and discard
//! them so the loop moves on to its next tick. A panicking tick is treated
//! the same way.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A loop spawned by the scheduler.
#[derive(Debug)]
struct ScheduledTask {
    /// Task name, used in log records.
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owns a set of periodic loops sharing one cancellation token.
pub struct Scheduler {
    token: CancellationToken,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            tasks: Vec::new(),
        }
    }

    /// Spawns a loop that calls `tick` every `period` until cancelled.
    ///
    /// The first tick fires immediately. A tick in progress is allowed to
    /// finish; cancellation is observed between ticks.
    pub fn spawn<F, Fut, E>(&mut self, name: &'static str, period: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(task = name, period_ms = period.as_millis() as u64, "Loop started");

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match tokio::spawn(tick()).await {
                    Ok(Ok(())) => debug!(task = name, "Tick completed"),
                    Ok(Err(e)) => warn!(task = name, error = %e, "Tick failed, discarded"),
                    Err(e) => error!(task = name, error = %e, "Tick panicked, discarded"),
                }
            }

            info!(task = name, "Loop stopped");
        });

        self.tasks.push(ScheduledTask { name, handle });
    }

    /// Cancels every loop and waits for all of them to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        for task in self.tasks {
            if let Err(e) = task.handle.await {
                error!(task = task.name, error = %e, "Loop terminated abnormally");
            }
        }
    }
}
