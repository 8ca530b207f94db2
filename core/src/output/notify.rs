use crate::prelude::StageResult;
use std::path::PathBuf;

/// Outbound notification transport. One call per fired event, no retries.
pub trait Notifier {
    fn notify(&mut self, subject: &str, body: &str, attachments: &[PathBuf]) -> StageResult<()>;
}

/// Fixed subject and body attached to every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

impl Default for NotificationMessage {
    fn default() -> Self {
        Self::new("motion detected", "RPI detected motion.")
    }
}
