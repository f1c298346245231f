use serde::Deserialize;
use serde_json::Value;

use crate::domain::order::{display_price, OrderStatus};
use crate::events::{NotificationEvent, NotificationKind, OrderChange};
use crate::models::Order;

const ORDERS_TABLE: &str = "orders";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

/// Row-level change as delivered by the store trigger or a webhook
#[derive(Debug, Clone, Deserialize)]
pub struct RawChange {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    #[error("malformed change payload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("{0:?} change carries no record")]
    MissingRecord(ChangeType),

    #[error("record is not an order row: {0}")]
    Record(#[source] serde_json::Error),
}

impl RawChange {
    pub fn parse(payload: &str) -> Result<Self, ChangeError> {
        serde_json::from_str(payload).map_err(ChangeError::Payload)
    }

    fn new_order(&self) -> Result<Order, ChangeError> {
        let record = self
            .record
            .clone()
            .ok_or(ChangeError::MissingRecord(self.change_type))?;
        serde_json::from_value(record).map_err(ChangeError::Record)
    }

    /// Status from the previous row snapshot, if the snapshot carries one
    fn old_status(&self) -> Option<OrderStatus> {
        self.old_record
            .as_ref()
            .and_then(|old| old.get("status"))
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
    }
}

/// Turn a raw change into the event published on the bus.
///
/// Inserts always produce a `new` event. Updates produce an `update` event
/// only when the status differs from the previous snapshot. Everything else
/// (deletes, other tables) yields `Ok(None)`.
pub fn normalize(raw: &RawChange) -> Result<Option<OrderChange>, ChangeError> {
    if raw.table.as_deref().is_some_and(|table| table != ORDERS_TABLE) {
        return Ok(None);
    }

    match raw.change_type {
        ChangeType::Insert => {
            let order = raw.new_order()?;
            let notification = NotificationEvent {
                kind: NotificationKind::New,
                title: "New order received".to_string(),
                body: format!(
                    "Order #{} - {} ETB",
                    order.short_id(),
                    display_price(order.total_price)
                ),
                order_id: order.id.clone(),
            };

            Ok(Some(OrderChange { notification, order, previous_status: None }))
        }
        ChangeType::Update => {
            let order = raw.new_order()?;
            let previous_status = raw.old_status();

            if previous_status == Some(order.status) {
                return Ok(None);
            }

            let notification = NotificationEvent {
                kind: NotificationKind::Update,
                title: "Order status updated".to_string(),
                body: format!("Order #{} is now {}", order.short_id(), order.status),
                order_id: order.id.clone(),
            };

            Ok(Some(OrderChange { notification, order, previous_status }))
        }
        ChangeType::Delete => Ok(None),
    }
}
