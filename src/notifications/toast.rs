use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::dispatcher::ToastSink;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastSeverity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: ToastSeverity,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Ephemeral toasts. Each one removes itself once its duration elapses.
#[derive(Clone, Default)]
pub struct ToastQueue {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime
    pub fn show(
        &self,
        title: &str,
        message: &str,
        severity: ToastSeverity,
        duration: Option<Duration>,
    ) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            title: title.to_string(),
            message: message.to_string(),
            severity,
            duration: duration.unwrap_or(DEFAULT_TOAST_DURATION),
        };
        let id = toast.id;
        let expires_in = toast.duration;

        self.lock().push(toast);

        let toasts = Arc::clone(&self.toasts);
        tokio::spawn(async move {
            tokio::time::sleep(expires_in).await;
            toasts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|t| t.id != id);
        });

        id
    }

    /// Remove a toast early. Returns false if it had already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut toasts = self.lock();
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Toast>> {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ToastSink for ToastQueue {
    fn push_toast(&self, title: &str, message: &str, severity: ToastSeverity) {
        self.show(title, message, severity, None);
    }
}
