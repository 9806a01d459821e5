//! Timeout supervisor - bounds a step's wall-clock time

use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Outcome of supervised work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supervised<T> {
    /// The work returned before the limit
    Finished(T),
    /// The limit elapsed first; the work was left running
    TimedOut,
    /// The work panicked
    Crashed(String),
}

/// Runs work on its own task and waits for it up to a limit.
///
/// On timeout the task is detached rather than aborted: stopping whatever
/// it drives (the step container) is the caller's job, after which the task
/// winds down on its own.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSupervisor {
    limit: Duration,
}

impl TimeoutSupervisor {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    /// Limit given in minutes, as in the pipeline document
    pub fn from_minutes(minutes: f64) -> Self {
        Self::new(minutes_to_duration(minutes))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub async fn run<F>(&self, work: F) -> Supervised<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let mut task = tokio::spawn(work);

        match timeout(self.limit, &mut task).await {
            Ok(Ok(output)) => Supervised::Finished(output),
            Ok(Err(e)) => Supervised::Crashed(e.to_string()),
            Err(_) => {
                debug!("Work exceeded {:?}, detaching its task", self.limit);
                // dropping the JoinHandle detaches the task
                drop(task);
                Supervised::TimedOut
            }
        }
    }
}

/// Convert minutes to a duration; negative or NaN values become zero
pub fn minutes_to_duration(minutes: f64) -> Duration {
    Duration::try_from_secs_f64(minutes.max(0.0) * 60.0).unwrap_or(Duration::MAX)
}
