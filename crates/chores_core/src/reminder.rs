//! Reminder scheduler.
//!
//! Each run lists the tasks of a scope, keeps the pending ones whose
//! reminder is due under the configured [`ReminderPolicy`], stamps
//! `last_notified_at` and then dispatches one notification per task.
//! Stamping happens before dispatch, so a crash between the two loses a
//! reminder instead of repeating one.

use crate::clock::Clock;
use crate::error::{AppError, TaskFailure};
use crate::model::{Priority, Task};
use crate::notify::{NotificationSink, reminder_message};
use crate::store::{Scope, TaskStore, TaskUpdate};
use futures::StreamExt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

/// Local hours during which urgent chores may be reminded.
pub const URGENT_HOURS: RangeInclusive<u8> = 8..=23;
pub const URGENT_COOLDOWN: Duration = Duration::hours(1);
/// Local hours at which normal chores may be reminded.
pub const NORMAL_HOURS: [u8; 3] = [18, 20, 22];
pub const NORMAL_COOLDOWN: Duration = Duration::hours(2);

const DEFAULT_CONCURRENCY: usize = 8;

/// How reminder eligibility is decided. A scheduler runs exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderPolicy {
    /// Priority windows plus a minimum interval between reminders.
    Cooldown,
    /// Fixed reminders in the last `slots` hours before midnight.
    BeforeMidnight { slots: u8 },
}

impl ReminderPolicy {
    pub fn is_due(&self, task: &Task, now: OffsetDateTime) -> bool {
        if !task.is_pending() {
            return false;
        }

        match *self {
            Self::Cooldown => match task.priority {
                Priority::Urgent => urgent_due(now, task.last_notified_at),
                Priority::Normal => normal_due(now, task.last_notified_at),
                Priority::Low => false,
            },
            Self::BeforeMidnight { slots } => {
                before_midnight_due(slots, task.priority, now, task.last_notified_at)
            }
        }
    }
}

fn cooldown_elapsed(
    now: OffsetDateTime,
    last_notified_at: Option<OffsetDateTime>,
    cooldown: Duration,
) -> bool {
    match last_notified_at {
        None => true,
        Some(last) => now - last >= cooldown,
    }
}

pub fn urgent_due(now: OffsetDateTime, last_notified_at: Option<OffsetDateTime>) -> bool {
    URGENT_HOURS.contains(&now.hour()) && cooldown_elapsed(now, last_notified_at, URGENT_COOLDOWN)
}

pub fn normal_due(now: OffsetDateTime, last_notified_at: Option<OffsetDateTime>) -> bool {
    NORMAL_HOURS.contains(&now.hour())
        && cooldown_elapsed(now, last_notified_at, NORMAL_COOLDOWN)
}

/// Slot hours are the last `slots` whole hours of the day. Low priority
/// chores only get the final one.
pub fn before_midnight_due(
    slots: u8,
    priority: Priority,
    now: OffsetDateTime,
    last_notified_at: Option<OffsetDateTime>,
) -> bool {
    let slots = slots.clamp(1, 24);
    let hour = now.hour();
    let in_slot = match priority {
        Priority::Low => hour == 23,
        Priority::Urgent | Priority::Normal => hour >= 24 - slots,
    };
    if !in_slot {
        return false;
    }

    let slot_start = now
        - Duration::minutes(now.minute().into())
        - Duration::seconds(now.second().into())
        - Duration::nanoseconds(now.nanosecond().into());
    last_notified_at.is_none_or(|last| last < slot_start)
}

#[derive(Debug, Default)]
pub struct ReminderOutcome {
    pub checked: usize,
    pub notified: Vec<Task>,
    pub failures: Vec<TaskFailure>,
}

enum Delivery {
    Sent(Task),
    Failed(TaskFailure),
}

pub struct ReminderScheduler {
    store: Arc<dyn TaskStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    policy: ReminderPolicy,
    concurrency: usize,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn TaskStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sink,
            clock,
            policy: ReminderPolicy::Cooldown,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_policy(mut self, policy: ReminderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// One pass over `scope`. Only a failure to list the scope is an error;
    /// per-task failures are reported in the outcome.
    pub async fn run_once(&self, scope: &Scope) -> Result<ReminderOutcome, AppError> {
        let now = self.clock.now();
        let tasks = self.store.list_tasks(scope).await?;
        let checked = tasks.len();

        let due: Vec<Task> = tasks
            .into_iter()
            .filter(|task| self.policy.is_due(task, now))
            .collect();
        debug!(%scope, checked, due = due.len(), "evaluated reminders");

        let deliveries: Vec<Delivery> = futures::stream::iter(due)
            .map(|task| self.remind(task, now))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut outcome = ReminderOutcome {
            checked,
            ..ReminderOutcome::default()
        };
        for delivery in deliveries {
            match delivery {
                Delivery::Sent(task) => outcome.notified.push(task),
                Delivery::Failed(failure) => outcome.failures.push(failure),
            }
        }
        outcome.notified.sort_by(|a, b| a.id.cmp(&b.id));
        outcome.failures.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        info!(
            %scope,
            checked,
            notified = outcome.notified.len(),
            failed = outcome.failures.len(),
            "reminder run finished"
        );
        Ok(outcome)
    }

    async fn remind(&self, mut task: Task, now: OffsetDateTime) -> Delivery {
        let update = TaskUpdate::Notified { at: now };
        if let Err(error) = self.store.update_task(&task.id, update.clone()).await {
            warn!(task_id = %task.id, %error, "could not stamp reminder, skipping");
            return Delivery::Failed(TaskFailure::new(&task.id, error));
        }
        update.apply(&mut task);

        let (title, body) = reminder_message(&task);
        match self.sink.dispatch(&title, &body).await {
            Ok(()) => {
                debug!(task_id = %task.id, priority = task.priority.label(), "reminder sent");
                Delivery::Sent(task)
            }
            Err(error) => {
                warn!(task_id = %task.id, %error, "reminder dispatch failed");
                Delivery::Failed(TaskFailure::new(&task.id, error))
            }
        }
    }
}
