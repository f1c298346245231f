use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dispatcher::NotificationSink;
use super::storage::Storage;
use crate::events::NotificationKind;

/// Entries kept; older ones are evicted first
pub const MAX_NOTIFICATIONS: usize = 50;

pub const STORAGE_KEY: &str = "office-notifications";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Newest-first notification log, mirrored to storage on every mutation
pub struct NotificationStore {
    storage: Arc<dyn Storage>,
    entries: Mutex<Vec<StoredNotification>>,
}

impl NotificationStore {
    /// Rehydrate from storage. Missing or unreadable state yields an empty log.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let entries = match storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<StoredNotification>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(MAX_NOTIFICATIONS);
                    tracing::debug!(count = entries.len(), "Restored notifications");
                    entries
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored notifications are corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored notifications, starting empty");
                Vec::new()
            }
        };

        Self { storage, entries: Mutex::new(entries) }
    }

    pub fn add(&self, title: &str, body: &str, kind: NotificationKind) -> StoredNotification {
        let notification = StoredNotification {
            id: Uuid::now_v7().to_string(),
            title: title.to_string(),
            body: body.to_string(),
            kind,
            created_at: Utc::now(),
            read: false,
        };

        let mut entries = self.lock();
        entries.insert(0, notification.clone());
        entries.truncate(MAX_NOTIFICATIONS);
        self.persist(&entries);

        notification
    }

    pub fn mark_read(&self, id: &str) {
        let mut entries = self.lock();
        if let Some(entry) = entries.iter_mut().find(|n| n.id == id) {
            entry.read = true;
            self.persist(&entries);
        }
    }

    pub fn mark_all_read(&self) {
        let mut entries = self.lock();
        entries.iter_mut().for_each(|n| n.read = true);
        self.persist(&entries);
    }

    pub fn clear(&self, id: &str) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|n| n.id != id);
        if entries.len() != before {
            self.persist(&entries);
        }
    }

    pub fn clear_all(&self) {
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries);
    }

    pub fn unread_count(&self) -> usize {
        self.lock().iter().filter(|n| !n.read).count()
    }

    pub fn notifications(&self) -> Vec<StoredNotification> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredNotification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &[StoredNotification]) {
        let encoded = match serde_json::to_string(entries) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(error = %e, "Could not encode notifications");
                return;
            }
        };

        if let Err(e) = self.storage.set(STORAGE_KEY, &encoded) {
            tracing::warn!(error = %e, "Could not persist notifications");
        }
    }
}

impl NotificationSink for NotificationStore {
    fn record(&self, title: &str, body: &str, kind: NotificationKind) {
        self.add(title, body, kind);
    }
}
