use crate::error::AppError;
use crate::model::Task;
use crate::store::{Scope, TaskStore, TaskUpdate};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

/// In-process store for the job tests.
///
/// Failures can be injected for the whole listing or for individual task
/// ids, which is how partial-failure handling in the jobs is exercised.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
    fail_list: Mutex<bool>,
    failing_updates: Mutex<HashSet<String>>,
    updates: Mutex<Vec<(String, TaskUpdate)>>,
}

impl MemoryTaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    pub fn fail_listing(&self, fail: bool) {
        *self.fail_list.lock() = fail;
    }

    pub fn fail_updates_for(&self, task_id: &str) {
        self.failing_updates.lock().insert(task_id.to_string());
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks.lock().iter().find(|t| t.id == task_id).cloned()
    }

    /// Every update that was applied, in order.
    pub fn applied_updates(&self) -> Vec<(String, TaskUpdate)> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list_tasks(&self, scope: &Scope) -> Result<Vec<Task>, AppError> {
        if *self.fail_list.lock() {
            return Err(AppError::store("task listing unavailable"));
        }
        Ok(self
            .tasks
            .lock()
            .iter()
            .filter(|task| scope.matches(task))
            .cloned()
            .collect())
    }

    async fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<(), AppError> {
        if self.failing_updates.lock().contains(task_id) {
            return Err(AppError::store(format!("write rejected for {task_id}")));
        }

        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| AppError::invalid_input(format!("task not found: {task_id}")))?;
        update.apply(task);
        self.updates.lock().push((task_id.to_string(), update));
        Ok(())
    }
}
