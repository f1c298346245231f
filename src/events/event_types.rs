use serde::{Deserialize, Serialize};

use crate::domain::order::OrderStatus;
use crate::models::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    New,
    Update,
}

/// What a person should be told about an order change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub order_id: String,
}

/// A normalised order change as published on the bus
#[derive(Debug, Clone, PartialEq)]
pub struct OrderChange {
    pub notification: NotificationEvent,
    /// Row snapshot after the change
    pub order: Order,
    /// Status before the change, present for updates only
    pub previous_status: Option<OrderStatus>,
}

impl OrderChange {
    /// Updates are only published when the status moved, so any update is one.
    /// A missing previous status (narrow old-row snapshot) still counts.
    pub fn is_status_change(&self) -> bool {
        self.notification.kind == NotificationKind::Update
            && self.previous_status != Some(self.order.status)
    }
}
