//! Task persistence seen through the narrow interface the jobs need.

use crate::error::AppError;
use crate::model::Task;
use async_trait::async_trait;
use time::OffsetDateTime;

pub mod json_store;
#[cfg(test)]
mod memory;

pub use json_store::JsonTaskStore;
#[cfg(test)]
pub use memory::MemoryTaskStore;

/// Which slice of the store a job run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Group(String),
}

impl Scope {
    pub fn from_group(group: Option<&str>) -> Self {
        match group.map(str::trim) {
            Some(id) if !id.is_empty() => Self::Group(id.to_string()),
            _ => Self::All,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Group(id) => task.group_id == *id,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all groups"),
            Self::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// Field changes a single task update may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    Notified { at: OffsetDateTime },
    ResetCompletion,
    Completed { by: String, at: OffsetDateTime },
}

impl TaskUpdate {
    pub fn apply(&self, task: &mut Task) {
        match self {
            Self::Notified { at } => {
                // last_notified_at never moves backwards
                let stamped = match task.last_notified_at {
                    Some(previous) if previous > *at => previous,
                    _ => *at,
                };
                task.last_notified_at = Some(stamped);
            }
            Self::ResetCompletion => {
                task.completed_by = None;
                task.completed_at = None;
            }
            Self::Completed { by, at } => {
                task.completed_by = Some(by.clone());
                task.completed_at = Some(*at);
            }
        }
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self, scope: &Scope) -> Result<Vec<Task>, AppError>;

    async fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<(), AppError>;
}
