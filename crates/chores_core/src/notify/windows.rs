use crate::error::AppError;
use crate::notify::NotificationSink;
use async_trait::async_trait;
use tauri_winrt_notification::Toast;

pub struct WindowsSink;

#[async_trait]
impl NotificationSink for WindowsSink {
    async fn dispatch(&self, title: &str, body: &str) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(title)
            .text1(body)
            .show()
            .map_err(|err| AppError::notify(err.to_string()))
    }
}
