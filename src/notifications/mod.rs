// ============================================================================
// In-App Notifications
// ============================================================================
//
// Presentation surfaces for order changes and the dispatcher that feeds them:
// - store:      persisted, bounded, newest-first notification log
// - toast:      transient, auto-expiring toasts
// - native:     OS-level notifications, gated on permission
// - slot:       single-occupant sink registration handed to the dispatcher
// - dispatcher: turns one NotificationEvent into all of the above
//
// ============================================================================

mod dispatcher;
mod native;
mod slot;
mod storage;
mod store;
mod toast;

pub use dispatcher::{DispatchReport, NotificationDispatcher, NotificationSink, ToastSink};
pub use native::{
    HeadlessNotifier, NativeNotification, NativeNotificationError, NativeNotifier, NotificationPermission,
};
pub use slot::{SinkRegistration, SinkSlot};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{NotificationStore, StoredNotification, MAX_NOTIFICATIONS, STORAGE_KEY};
pub use toast::{Toast, ToastQueue, ToastSeverity, DEFAULT_TOAST_DURATION};
