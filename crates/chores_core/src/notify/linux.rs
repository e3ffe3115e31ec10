use crate::error::AppError;
use crate::notify::{APP_NAME, NotificationSink};
use async_trait::async_trait;
use notify_rust::Notification;

pub struct LinuxSink;

#[async_trait]
impl NotificationSink for LinuxSink {
    async fn dispatch(&self, title: &str, body: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.appname(APP_NAME);
        notification.summary(title);
        notification.body(body);
        notification
            .show()
            .map_err(|err| AppError::notify(err.to_string()))?;
        Ok(())
    }
}
