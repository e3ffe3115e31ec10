use crate::error::AppError;
use crate::model::{Priority, Task};
use async_trait::async_trait;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxSink;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsSink;

const APP_NAME: &str = "chores";

/// Where reminders end up. Delivery is best effort.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn dispatch(&self, title: &str, body: &str) -> Result<(), AppError>;
}

pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn dispatch(&self, _title: &str, _body: &str) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn sink_from_env() -> Result<Box<dyn NotificationSink>, AppError> {
    if std::env::var("CHORES_DISABLE_NOTIFICATIONS").is_ok() {
        return Ok(Box::new(NoopSink));
    }

    match platform_sink() {
        Ok(sink) => Ok(sink),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopSink)),
            other => Err(other),
        },
    }
}

pub fn reminder_message(task: &Task) -> (String, String) {
    let title = match task.priority {
        Priority::Urgent => format!("{APP_NAME}: urgent chore"),
        Priority::Normal => format!("{APP_NAME}: chore reminder"),
        Priority::Low => format!("{APP_NAME}: before the day ends"),
    };
    let body = match task.assigned_to.as_deref() {
        Some(user) => format!("{} is still pending for {} ({})", task.name, user, task.group_id),
        None => format!("{} is still pending ({})", task.name, task.group_id),
    };
    (title, body)
}

#[cfg(target_os = "linux")]
pub fn platform_sink() -> Result<Box<dyn NotificationSink>, AppError> {
    Ok(Box::new(LinuxSink))
}

#[cfg(windows)]
pub fn platform_sink() -> Result<Box<dyn NotificationSink>, AppError> {
    Ok(Box::new(WindowsSink))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_sink() -> Result<Box<dyn NotificationSink>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::reminder_message;
    use crate::model::{Frequency, Priority, Task};
    use time::macros::datetime;

    fn task(priority: Priority, assigned_to: Option<&str>) -> Task {
        Task {
            id: "task-1".to_string(),
            name: "Take out the bins".to_string(),
            group_id: "home".to_string(),
            priority,
            frequency: Frequency::Weekly,
            points: 2,
            assigned_to: assigned_to.map(str::to_string),
            created_at: datetime!(2025-06-01 09:00 UTC),
            completed_by: None,
            completed_at: None,
            last_notified_at: None,
        }
    }

    #[test]
    fn reminder_message_names_chore_and_assignee() {
        let (title, body) = reminder_message(&task(Priority::Urgent, Some("ben")));
        assert_eq!(title, "chores: urgent chore");
        assert_eq!(body, "Take out the bins is still pending for ben (home)");
    }

    #[test]
    fn reminder_message_without_assignee() {
        let (title, body) = reminder_message(&task(Priority::Low, None));
        assert_eq!(title, "chores: before the day ends");
        assert_eq!(body, "Take out the bins is still pending (home)");
    }
}
