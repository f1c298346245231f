use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// The runtime has no native notification facility
    Unsupported,
    /// Never asked
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeNotification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    /// Notifications sharing a tag replace each other
    pub tag: String,
    pub auto_close: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum NativeNotificationError {
    #[error("native notifications are not supported here")]
    Unsupported,

    #[error("native notification failed: {0}")]
    Failed(String),
}

/// OS-level notification facility of the host runtime
#[async_trait]
pub trait NativeNotifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Prompt the user. Resolves with the permission that results.
    async fn request_permission(&self) -> NotificationPermission;

    fn show(&self, notification: &NativeNotification) -> Result<(), NativeNotificationError>;
}

/// Notifier for hosts without a desktop session (the service binary)
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessNotifier;

#[async_trait]
impl NativeNotifier for HeadlessNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Unsupported
    }

    async fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Unsupported
    }

    fn show(&self, _notification: &NativeNotification) -> Result<(), NativeNotificationError> {
        Err(NativeNotificationError::Unsupported)
    }
}
