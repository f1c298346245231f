use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::events::{Handler, NotificationEvent, NotificationKind, OrderChange};
use crate::metrics::Metrics;

use super::native::{NativeNotification, NativeNotifier, NotificationPermission};
use super::slot::SinkSlot;
use super::toast::ToastSeverity;

// ============================================================================
// Notification Dispatcher
// ============================================================================
//
// The only bridge between the change feed and the in-app surfaces. One event
// goes to:
// 1. the toast sink (success for new orders, info for updates)
// 2. the native notifier, only when permission is granted
// 3. the persistent notification sink
//
// Every surface is best-effort. Nothing here returns an error to the caller.
//
// ============================================================================

const NATIVE_AUTO_CLOSE: Duration = Duration::from_secs(5);
const NATIVE_ICON: &str = "/favicon.ico";

pub trait ToastSink: Send + Sync {
    fn push_toast(&self, title: &str, message: &str, severity: ToastSeverity);
}

pub trait NotificationSink: Send + Sync {
    fn record(&self, title: &str, body: &str, kind: NotificationKind);
}

/// Which surfaces a dispatch reached
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub toast: bool,
    pub native: bool,
    pub stored: bool,
}

pub struct NotificationDispatcher {
    toasts: SinkSlot<dyn ToastSink>,
    store: SinkSlot<dyn NotificationSink>,
    native: Arc<dyn NativeNotifier>,
    metrics: Arc<Metrics>,
}

impl NotificationDispatcher {
    pub fn new(
        toasts: SinkSlot<dyn ToastSink>,
        store: SinkSlot<dyn NotificationSink>,
        native: Arc<dyn NativeNotifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { toasts, store, native, metrics }
    }

    pub fn dispatch(&self, event: &NotificationEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        if let Some(toasts) = self.toasts.current() {
            toasts.push_toast(&event.title, &event.body, severity_for(event.kind));
            self.metrics.record_dispatch("toast");
            report.toast = true;
        }

        if self.native.permission() == NotificationPermission::Granted {
            let notification = NativeNotification {
                title: event.title.clone(),
                body: event.body.clone(),
                icon: Some(NATIVE_ICON.to_string()),
                tag: event.order_id.clone(),
                auto_close: NATIVE_AUTO_CLOSE,
            };
            match self.native.show(&notification) {
                Ok(()) => {
                    self.metrics.record_dispatch("native");
                    report.native = true;
                }
                Err(e) => {
                    tracing::debug!(error = %e, order_id = %event.order_id, "Native notification not shown");
                }
            }
        }

        if let Some(store) = self.store.current() {
            store.record(&event.title, &event.body, event.kind);
            self.metrics.record_dispatch("store");
            report.stored = true;
        }

        tracing::debug!(
            order_id = %event.order_id,
            kind = ?event.kind,
            toast = report.toast,
            native = report.native,
            stored = report.stored,
            "🔔 Notification dispatched"
        );

        report
    }

    /// Bus handler that dispatches every order change
    pub fn handler(self: Arc<Self>) -> Handler<OrderChange> {
        Arc::new(move |change: OrderChange| {
            let dispatcher = Arc::clone(&self);
            Box::pin(async move {
                dispatcher.dispatch(&change.notification);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }
}

fn severity_for(kind: NotificationKind) -> ToastSeverity {
    match kind {
        NotificationKind::New => ToastSeverity::Success,
        NotificationKind::Update => ToastSeverity::Info,
    }
}
