//! Periodic trigger for the reminder and reset jobs.

use crate::clock::Clock;
use crate::error::AppError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run on start, then again `Duration` after each run completes.
    Every(Duration),
    /// Run once a day at the given local time.
    DailyAt { hour: u8, minute: u8 },
}

impl Schedule {
    /// Delay from `now` until the next run, for a run that has just finished
    /// (or, for `DailyAt`, has not run yet).
    pub fn next_delay(&self, now: OffsetDateTime) -> Duration {
        match *self {
            Self::Every(interval) => interval,
            Self::DailyAt { hour, minute } => {
                let target = match time::Time::from_hms(hour.min(23), minute.min(59), 0) {
                    Ok(target) => target,
                    Err(_) => time::Time::MIDNIGHT,
                };
                let mut next = now.replace_time(target);
                if next <= now {
                    next += time::Duration::days(1);
                }
                (next - now).unsigned_abs()
            }
        }
    }

    fn runs_on_start(&self) -> bool {
        matches!(self, Self::Every(_))
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Every(interval) => write!(f, "every {} minutes", interval.as_secs() / 60),
            Self::DailyAt { hour, minute } => write!(f, "daily at {hour:02}:{minute:02}"),
        }
    }
}

/// Spawn `job` on the runtime, re-running it per `schedule` until `cancel`
/// fires. The next run is always computed after the previous one returns,
/// so runs of the same job never overlap.
pub fn spawn_job<F, Fut>(
    name: &'static str,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), AppError>> + Send + 'static,
{
    tokio::spawn(async move {
        info!(job = name, %schedule, "job started");
        let mut first = true;

        loop {
            let delay = if first && schedule.runs_on_start() {
                Duration::ZERO
            } else {
                schedule.next_delay(clock.now())
            };
            first = false;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            match job().await {
                Ok(()) => debug!(job = name, "run completed"),
                Err(error) => warn!(job = name, %error, "run failed, will retry on next schedule"),
            }
        }

        info!(job = name, "job stopped");
    })
}
