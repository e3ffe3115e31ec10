use crate::error::AppError;
use crate::model::{Frequency, Priority, Task};
use crate::notify::NotificationSink;
use async_trait::async_trait;
use parking_lot::Mutex;
use time::macros::datetime;

pub fn task(id: &str, priority: Priority, frequency: Frequency) -> Task {
    Task {
        id: id.to_string(),
        name: format!("chore {id}"),
        group_id: "home".to_string(),
        priority,
        frequency,
        points: 1,
        assigned_to: None,
        created_at: datetime!(2025-01-01 09:00 UTC),
        completed_by: None,
        completed_at: None,
        last_notified_at: None,
    }
}

pub fn completed(mut task: Task, by: &str) -> Task {
    task.completed_by = Some(by.to_string());
    task.completed_at = Some(datetime!(2025-01-02 09:00 UTC));
    task
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn dispatch(&self, title: &str, body: &str) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::notify("notification daemon unavailable"));
        }
        self.sent.lock().push((title.to_string(), body.to_string()));
        Ok(())
    }
}
