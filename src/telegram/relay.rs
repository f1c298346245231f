use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

use crate::events::{Handler, OrderChange};
use crate::metrics::Metrics;
use crate::realtime::{normalize, ChangeError, RawChange};
use crate::store::Directory;

use super::client::MessageSender;
use super::format::order_status_message;

// ============================================================================
// Telegram Relay
// ============================================================================
//
// Tells an employee on Telegram when their order changes status.
//
// 1. Only status changes are relayed
// 2. Resolve the employee; no linked chat id means a silent skip
// 3. Company name is best-effort (the line is omitted on failure)
// 4. Format with the shared template and send once, no retry
//
// Nothing here can fail the in-app path: the relay runs as its own bus
// handler and reports its result instead of returning errors.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RelayOutcome {
    Sent { chat_id: i64 },
    NotStatusChange,
    NoEmployee,
    NotLinked { employee_id: String },
    Failed { reason: String },
}

impl RelayOutcome {
    fn label(&self) -> &'static str {
        match self {
            RelayOutcome::Sent { .. } => "sent",
            RelayOutcome::Failed { .. } => "failed",
            _ => "skipped",
        }
    }
}

pub struct TelegramRelay {
    directory: Arc<dyn Directory>,
    sender: Arc<dyn MessageSender>,
    metrics: Arc<Metrics>,
}

impl TelegramRelay {
    pub fn new(directory: Arc<dyn Directory>, sender: Arc<dyn MessageSender>, metrics: Arc<Metrics>) -> Self {
        Self { directory, sender, metrics }
    }

    pub async fn relay(&self, change: &OrderChange) -> RelayOutcome {
        let outcome = self.try_relay(change).await;
        self.metrics.record_telegram(outcome.label());

        match &outcome {
            RelayOutcome::Sent { chat_id } => {
                tracing::info!(order_id = %change.order.id, chat_id, status = %change.order.status, "📨 Telegram status update sent");
            }
            RelayOutcome::Failed { reason } => {
                tracing::error!(order_id = %change.order.id, reason = %reason, "❌ Telegram status update failed");
            }
            skipped => {
                tracing::debug!(order_id = %change.order.id, outcome = ?skipped, "Telegram status update skipped");
            }
        }

        outcome
    }

    /// Relay a raw `{type, record, old_record}` payload from the push endpoint
    pub async fn relay_raw(&self, raw: &RawChange) -> Result<RelayOutcome, ChangeError> {
        match normalize(raw)? {
            Some(change) => Ok(self.relay(&change).await),
            None => Ok(RelayOutcome::NotStatusChange),
        }
    }

    async fn try_relay(&self, change: &OrderChange) -> RelayOutcome {
        if !change.is_status_change() {
            return RelayOutcome::NotStatusChange;
        }

        let order = &change.order;
        let Some(employee_id) = order.employee_id.as_deref() else {
            return RelayOutcome::NoEmployee;
        };

        let employee = match self.directory.employee(employee_id).await {
            Ok(Some(employee)) => employee,
            Ok(None) => return RelayOutcome::NoEmployee,
            Err(e) => return RelayOutcome::Failed { reason: format!("employee lookup: {e}") },
        };

        let Some(chat_id) = employee.telegram_chat_id else {
            return RelayOutcome::NotLinked { employee_id: employee.id };
        };

        let company_name = match order.company_id.as_deref() {
            Some(company_id) => match self.directory.company_name(company_id).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(company_id, error = %e, "Company lookup failed, omitting company line");
                    None
                }
            },
            None => None,
        };

        let text = order_status_message(order, &employee.name, company_name.as_deref());

        match self.sender.send_message(chat_id, &text).await {
            Ok(()) => RelayOutcome::Sent { chat_id },
            Err(e) => RelayOutcome::Failed { reason: e.to_string() },
        }
    }

    /// Bus handler relaying every order change
    pub fn handler(self: Arc<Self>) -> Handler<OrderChange> {
        Arc::new(move |change: OrderChange| {
            let relay = Arc::clone(&self);
            Box::pin(async move {
                relay.relay(&change).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderItems, OrderStatus};
    use crate::events::{NotificationEvent, NotificationKind};
    use crate::models::{Employee, Order};
    use crate::store::memory::MemoryStore;
    use crate::telegram::testing::RecordingSender;
    use chrono::Utc;
    use std::sync::atomic::Ordering;

    fn employee(chat: Option<i64>) -> Employee {
        Employee {
            id: "e1".to_string(),
            name: "Hana".to_string(),
            phone: Some("+251912345678".to_string()),
            telegram_chat_id: chat,
            company_id: Some("c1".to_string()),
        }
    }

    fn update(from: OrderStatus, to: OrderStatus) -> OrderChange {
        let order = Order {
            id: "abc12345-0000".to_string(),
            items: OrderItems::default(),
            total_price: 150.0,
            floor: Some("2".to_string()),
            status: to,
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
            company_id: Some("c1".to_string()),
            employee_id: Some("e1".to_string()),
            employee_name: Some("Hana".to_string()),
        };
        OrderChange {
            notification: NotificationEvent {
                kind: NotificationKind::Update,
                title: "Order status updated".to_string(),
                body: format!("Order #abc12345 is now {to}"),
                order_id: order.id.clone(),
            },
            order,
            previous_status: Some(from),
        }
    }

    fn relay(store: MemoryStore, sender: Arc<RecordingSender>) -> (TelegramRelay, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        (TelegramRelay::new(Arc::new(store), sender, metrics.clone()), metrics)
    }

    #[tokio::test]
    async fn test_status_change_is_sent_to_linked_employee() {
        let store = MemoryStore::default().with_employee(employee(Some(777))).with_company("c1", "Acme");
        let sender = Arc::new(RecordingSender::default());
        let (relay, metrics) = relay(store, sender.clone());

        let outcome = relay.relay(&update(OrderStatus::Preparing, OrderStatus::Delivering)).await;

        assert_eq!(outcome, RelayOutcome::Sent { chat_id: 777 });
        let messages = sender.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, 777);
        assert!(messages[0].1.contains("🚚"));
        assert!(messages[0].1.contains("<b>Company:</b> Acme"));
        assert_eq!(metrics.telegram_messages.with_label_values(&["sent"]).get(), 1);
    }

    #[tokio::test]
    async fn test_unlinked_employee_is_skipped_silently() {
        let store = MemoryStore::default().with_employee(employee(None));
        let sender = Arc::new(RecordingSender::default());
        let (relay, _) = relay(store, sender.clone());

        let outcome = relay.relay(&update(OrderStatus::Pending, OrderStatus::Preparing)).await;

        assert_eq!(outcome, RelayOutcome::NotLinked { employee_id: "e1".to_string() });
        assert!(sender.messages().is_empty());
    }

    #[tokio::test]
    async fn test_inserts_are_not_relayed() {
        let sender = Arc::new(RecordingSender::default());
        let (relay, _) = relay(MemoryStore::default().with_employee(employee(Some(1))), sender.clone());

        let mut change = update(OrderStatus::Pending, OrderStatus::Pending);
        change.notification.kind = NotificationKind::New;
        change.previous_status = None;

        assert_eq!(relay.relay(&change).await, RelayOutcome::NotStatusChange);
        assert!(sender.messages().is_empty());
    }

    #[tokio::test]
    async fn test_company_lookup_failure_omits_company_line() {
        let store = MemoryStore::default().with_employee(employee(Some(5))).with_company("c1", "Acme");
        store.fail_company_lookups.store(true, Ordering::SeqCst);
        let sender = Arc::new(RecordingSender::default());
        let (relay, _) = relay(store, sender.clone());

        let outcome = relay.relay(&update(OrderStatus::Delivering, OrderStatus::Delivered)).await;

        assert_eq!(outcome, RelayOutcome::Sent { chat_id: 5 });
        assert!(!sender.messages()[0].1.contains("Company"));
    }

    #[tokio::test]
    async fn test_send_failure_is_reported_not_raised() {
        let sender = Arc::new(RecordingSender::failing());
        let (relay, metrics) = relay(MemoryStore::default().with_employee(employee(Some(9))), sender);

        let outcome = relay.relay(&update(OrderStatus::Pending, OrderStatus::Preparing)).await;

        assert!(matches!(outcome, RelayOutcome::Failed { reason } if reason.contains("blocked")));
        assert_eq!(metrics.telegram_messages.with_label_values(&["failed"]).get(), 1);
    }

    #[tokio::test]
    async fn test_raw_push_payload() {
        let sender = Arc::new(RecordingSender::default());
        let (relay, _) = relay(MemoryStore::default().with_employee(employee(Some(3))), sender.clone());

        let row = |status: &str| {
            serde_json::json!({
                "id": "abc12345-0000",
                "items": "[{\"itemId\":\"m1\",\"name\":\"Coffee\",\"quantity\":1,\"price\":150}]",
                "total_price": 150,
                "status": status,
                "created_at": "2026-03-02T08:15:00Z",
                "employee_id": "e1"
            })
        };
        let raw: RawChange = serde_json::from_value(serde_json::json!({
            "type": "UPDATE",
            "table": "orders",
            "record": row("preparing"),
            "old_record": row("pending")
        }))
        .unwrap();

        assert_eq!(relay.relay_raw(&raw).await.unwrap(), RelayOutcome::Sent { chat_id: 3 });
        assert!(sender.messages()[0].1.contains("• 1x Coffee"));

        let unchanged: RawChange = serde_json::from_value(serde_json::json!({
            "type": "UPDATE",
            "record": row("pending"),
            "old_record": row("pending")
        }))
        .unwrap();
        assert_eq!(relay.relay_raw(&unchanged).await.unwrap(), RelayOutcome::NotStatusChange);
    }
}
