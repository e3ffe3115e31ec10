//! Recurrence resetter.
//!
//! Clears `completed_by`/`completed_at` on recurring chores whose period
//! boundary falls on the run date. The clear is unconditional for every
//! matching task, so a repeated run on the same date converges to the same
//! state.

use crate::clock::{Clock, is_last_day_of_month, is_week_boundary};
use crate::error::{AppError, TaskFailure};
use crate::model::{Frequency, Task};
use crate::store::{Scope, TaskStore, TaskUpdate};
use futures::StreamExt;
use std::sync::Arc;
use time::Date;
use tracing::{debug, info, warn};

const DEFAULT_CONCURRENCY: usize = 8;

/// Frequency classes whose boundary is `date`.
pub fn due_frequencies(date: Date) -> Vec<Frequency> {
    let mut due = vec![Frequency::Daily];
    if is_week_boundary(date) {
        due.push(Frequency::Weekly);
    }
    if is_last_day_of_month(date) {
        due.push(Frequency::Monthly);
    }
    due
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
    pub scope: Scope,
    pub authorized: bool,
}

impl ResetRequest {
    /// Request issued by the periodic job itself.
    pub fn scheduled(scope: Scope) -> Self {
        Self {
            scope,
            authorized: true,
        }
    }

    /// Request issued on behalf of a household member. Only the group admin
    /// gets an effective reset; everyone else gets a successful no-op.
    pub fn for_caller(group_id: &str, is_admin: bool) -> Self {
        Self {
            scope: Scope::Group(group_id.trim().to_string()),
            authorized: is_admin,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResetOutcome {
    pub frequencies: Vec<Frequency>,
    pub cleared: Vec<String>,
    pub failures: Vec<TaskFailure>,
    pub skipped_unauthorized: bool,
}

pub struct RecurrenceResetter {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl RecurrenceResetter {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run_once(&self, request: &ResetRequest) -> Result<ResetOutcome, AppError> {
        if !request.authorized {
            info!(scope = %request.scope, "reset requested by non-admin, ignoring");
            return Ok(ResetOutcome {
                skipped_unauthorized: true,
                ..ResetOutcome::default()
            });
        }

        let today = self.clock.now().date();
        let frequencies = due_frequencies(today);
        let tasks = self.store.list_tasks(&request.scope).await?;

        let matching: Vec<Task> = tasks
            .into_iter()
            .filter(|task| frequencies.contains(&task.frequency))
            .collect();
        debug!(
            scope = %request.scope,
            %today,
            matching = matching.len(),
            "resetting recurring chores"
        );

        let results: Vec<Result<String, TaskFailure>> = futures::stream::iter(matching)
            .map(|task| async move {
                match self
                    .store
                    .update_task(&task.id, TaskUpdate::ResetCompletion)
                    .await
                {
                    Ok(()) => Ok(task.id),
                    Err(error) => {
                        warn!(task_id = %task.id, %error, "could not reset chore");
                        Err(TaskFailure::new(&task.id, error))
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut outcome = ResetOutcome {
            frequencies,
            ..ResetOutcome::default()
        };
        for result in results {
            match result {
                Ok(task_id) => outcome.cleared.push(task_id),
                Err(failure) => outcome.failures.push(failure),
            }
        }
        outcome.cleared.sort();
        outcome.failures.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        info!(
            scope = %request.scope,
            cleared = outcome.cleared.len(),
            failed = outcome.failures.len(),
            "reset run finished"
        );
        Ok(outcome)
    }
}
