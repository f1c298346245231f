use std::sync::Arc;

use kameo::actor::ActorRef;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::actors::{HealthMonitorActor, HealthStatus, UpdateHealth, REALTIME_COMPONENT};
use crate::events::{EventBus, NotificationKind, OrderChange};
use crate::metrics::Metrics;
use crate::notifications::{NativeNotifier, NotificationPermission};
use crate::utils::RetryConfig;

use super::change::{normalize, RawChange};
use super::feed::{ChangeFeed, FeedChannel, SubscriptionStatus};

// ============================================================================
// Realtime Listener
// ============================================================================
//
// Keeps one live subscription on the change feed and publishes normalised
// order changes onto the event bus.
//
// Lifecycle:
// 1. Ask for native notification permission once (never awaited)
// 2. Subscribe. On ChannelError/TimedOut, close the channel and wait for the
//    retry policy's next delay before subscribing again
// 3. While subscribed, pump payloads to the bus. A lost connection is treated
//    like a failed subscription
// 4. Shutdown cancels a pending retry and closes the active channel
//
// At most one channel is open at any time.
//
// ============================================================================

pub struct RealtimeListener {
    feed: Arc<dyn ChangeFeed>,
    bus: EventBus<OrderChange>,
    retry: RetryConfig,
    metrics: Arc<Metrics>,
    notifier: Option<Arc<dyn NativeNotifier>>,
    health: Option<ActorRef<HealthMonitorActor>>,
}

/// Owner of a running listener. Dropping it also stops the listener, but
/// without waiting for the loop to finish.
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Cancel any pending retry, close the active channel and wait for the loop to end
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "🎧 Realtime listener task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

enum PumpExit {
    Shutdown,
    ChannelLost,
}

impl RealtimeListener {
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        bus: EventBus<OrderChange>,
        retry: RetryConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { feed, bus, retry, metrics, notifier: None, health: None }
    }

    /// Prompt for native notification permission when first started
    pub fn with_permission_prompt(mut self, notifier: Arc<dyn NativeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_health(mut self, health: ActorRef<HealthMonitorActor>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn start(self) -> ListenerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.run(receiver));
        ListenerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.prompt_for_permission();

        let mut backoff = self.retry.backoff();
        tracing::info!(retry_policy = ?self.retry, "🎧 Realtime listener starting");

        loop {
            let mut channel = self.feed.channel();

            let status = tokio::select! {
                status = channel.subscribe() => Some(status),
                _ = shutdown.changed() => None,
            };
            let Some(status) = status else {
                channel.close().await;
                break;
            };
            self.metrics.record_subscription(status.label());

            let reason = match status {
                SubscriptionStatus::Subscribed => {
                    backoff.reset();
                    tracing::info!("🎧 Subscribed to order changes");
                    self.report(HealthStatus::Healthy, None).await;

                    let exit = self.pump(channel.as_mut(), &mut shutdown).await;
                    channel.close().await;

                    match exit {
                        PumpExit::Shutdown => break,
                        PumpExit::ChannelLost => "connection lost".to_string(),
                    }
                }
                SubscriptionStatus::ChannelError(error) => {
                    channel.close().await;
                    format!("channel error: {error}")
                }
                SubscriptionStatus::TimedOut => {
                    channel.close().await;
                    "subscription timed out".to_string()
                }
            };
            drop(channel);

            let Some(delay) = backoff.next_delay() else {
                tracing::error!(
                    attempts = backoff.attempts(),
                    reason = %reason,
                    "❌ Realtime subscription retries exhausted, giving up"
                );
                self.report(HealthStatus::Unhealthy(reason), None).await;
                break;
            };

            self.metrics.record_retry_scheduled();
            tracing::warn!(
                reason = %reason,
                retry_in = ?delay,
                attempt = backoff.attempts(),
                "🔄 Realtime subscription failed, retry scheduled"
            );
            self.report(HealthStatus::Degraded(reason), Some(format!("retry in {delay:?}")))
                .await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("🎧 Realtime listener stopped");
    }

    async fn pump(&self, channel: &mut dyn FeedChannel, shutdown: &mut watch::Receiver<bool>) -> PumpExit {
        loop {
            tokio::select! {
                next = channel.next_change() => match next {
                    Some(payload) => self.publish(&payload),
                    None => return PumpExit::ChannelLost,
                },
                _ = shutdown.changed() => return PumpExit::Shutdown,
            }
        }
    }

    fn publish(&self, payload: &str) {
        let change = match RawChange::parse(payload).and_then(|raw| normalize(&raw)) {
            Ok(Some(change)) => change,
            Ok(None) => {
                self.metrics.record_change("ignored");
                return;
            }
            Err(e) => {
                self.metrics.record_change("malformed");
                tracing::warn!(error = %e, "⚠️ Skipping unreadable order change");
                return;
            }
        };

        let kind = match change.notification.kind {
            NotificationKind::New => "insert",
            NotificationKind::Update => "status_update",
        };
        self.metrics.record_change(kind);

        tracing::debug!(
            order_id = %change.order.id,
            status = %change.order.status,
            kind,
            "📥 Order change received"
        );

        let receivers = self.bus.publish(change);
        tracing::trace!(receivers, "Order change published");
    }

    fn prompt_for_permission(&self) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        if notifier.permission() != NotificationPermission::Default {
            return;
        }

        tokio::spawn(async move {
            let permission = notifier.request_permission().await;
            tracing::info!(?permission, "🔔 Native notification permission resolved");
        });
    }

    async fn report(&self, status: HealthStatus, details: Option<String>) {
        if let Some(health) = &self.health {
            let _ = health
                .tell(UpdateHealth {
                    component: REALTIME_COMPONENT.to_string(),
                    status,
                    details,
                })
                .send()
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{
        MemoryStorage, NativeNotification, NativeNotificationError, NotificationDispatcher,
        NotificationSink, NotificationStore, SinkSlot,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    #[derive(Debug, Default)]
    struct ChannelLog {
        subscribed_at: Vec<Instant>,
        open: Vec<usize>,
        closed: Vec<usize>,
    }

    /// Feed whose channels answer `subscribe` from a script. Once the script
    /// runs out every channel subscribes successfully.
    struct ScriptedFeed {
        script: Mutex<VecDeque<SubscriptionStatus>>,
        payloads: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
        log: Arc<Mutex<ChannelLog>>,
        next_id: AtomicUsize,
    }

    impl ScriptedFeed {
        fn new(script: Vec<SubscriptionStatus>) -> (Arc<Self>, mpsc::UnboundedSender<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let feed = Arc::new(Self {
                script: Mutex::new(script.into()),
                payloads: Mutex::new(Some(rx)),
                log: Arc::new(Mutex::new(ChannelLog::default())),
                next_id: AtomicUsize::new(0),
            });
            (feed, tx)
        }

        fn log(&self) -> std::sync::MutexGuard<'_, ChannelLog> {
            self.log.lock().unwrap()
        }
    }

    impl ChangeFeed for ScriptedFeed {
        fn channel(&self) -> Box<dyn FeedChannel> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let status = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(SubscriptionStatus::Subscribed);
            let payloads = if status == SubscriptionStatus::Subscribed {
                self.payloads.lock().unwrap().take()
            } else {
                None
            };

            Box::new(ScriptedChannel { id, status, payloads, log: Arc::clone(&self.log) })
        }
    }

    struct ScriptedChannel {
        id: usize,
        status: SubscriptionStatus,
        payloads: Option<mpsc::UnboundedReceiver<String>>,
        log: Arc<Mutex<ChannelLog>>,
    }

    #[async_trait]
    impl FeedChannel for ScriptedChannel {
        async fn subscribe(&mut self) -> SubscriptionStatus {
            let mut log = self.log.lock().unwrap();
            log.subscribed_at.push(Instant::now());
            log.open.push(self.id);
            self.status.clone()
        }

        async fn next_change(&mut self) -> Option<String> {
            match self.payloads.as_mut() {
                Some(rx) => rx.recv().await,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {
            let mut log = self.log.lock().unwrap();
            if !log.closed.contains(&self.id) {
                log.closed.push(self.id);
            }
        }
    }

    fn open_channels(log: &ChannelLog) -> Vec<usize> {
        log.open.iter().copied().filter(|id| !log.closed.contains(id)).collect()
    }

    fn listener(feed: Arc<ScriptedFeed>, retry: RetryConfig) -> (RealtimeListener, Arc<Metrics>, EventBus<OrderChange>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let bus = EventBus::new(16);
        let listener = RealtimeListener::new(feed, bus.clone(), retry, metrics.clone());
        (listener, metrics, bus)
    }

    fn order_row(status: &str) -> serde_json::Value {
        json!({
            "id": "abc12345-0000-4000-8000-000000000000",
            "items": [],
            "total_price": 150,
            "status": status,
            "created_at": "2026-03-02T08:15:00Z"
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_channel_errors_schedule_two_retries_five_seconds_apart() {
        let (feed, _tx) = ScriptedFeed::new(vec![
            SubscriptionStatus::ChannelError("CHANNEL_ERROR".to_string()),
            SubscriptionStatus::ChannelError("CHANNEL_ERROR".to_string()),
        ]);
        let (listener, metrics, _bus) = listener(feed.clone(), RetryConfig::realtime());
        let handle = listener.start();

        tokio::time::sleep(Duration::from_secs(11)).await;

        {
            let log = feed.log();
            assert_eq!(log.subscribed_at.len(), 3);
            assert_eq!(log.subscribed_at[1] - log.subscribed_at[0], Duration::from_secs(5));
            assert_eq!(log.subscribed_at[2] - log.subscribed_at[1], Duration::from_secs(5));
            assert_eq!(open_channels(&log), vec![2]);
        }
        assert_eq!(metrics.realtime_retries.get(), 2);

        handle.shutdown().await;
        assert!(open_channels(&feed.log()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_retry() {
        let (feed, _tx) = ScriptedFeed::new(vec![SubscriptionStatus::TimedOut]);
        let (listener, _metrics, _bus) = listener(feed.clone(), RetryConfig::realtime());
        let handle = listener.start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        let log = feed.log();
        assert_eq!(log.subscribed_at.len(), 1);
        assert!(open_channels(&log).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_gives_up() {
        let (feed, _tx) = ScriptedFeed::new(vec![
            SubscriptionStatus::TimedOut,
            SubscriptionStatus::TimedOut,
        ]);
        let retry = RetryConfig::fixed(Duration::from_secs(5), Some(1));
        let (listener, metrics, _bus) = listener(feed.clone(), retry);
        let handle = listener.start();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(handle.is_finished());
        assert_eq!(feed.log().subscribed_at.len(), 2);
        assert_eq!(metrics.realtime_retries.get(), 1);
        assert_eq!(metrics.realtime_subscriptions.with_label_values(&["timed_out"]).get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_then_unchanged_update_dispatches_once() {
        let (feed, tx) = ScriptedFeed::new(vec![]);
        let (listener, metrics, bus) = listener(feed, RetryConfig::realtime());

        let store_slot: SinkSlot<dyn NotificationSink> = SinkSlot::new();
        let store = Arc::new(NotificationStore::load(Arc::new(MemoryStorage::default())));
        let _registration = store_slot.register(store.clone());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            SinkSlot::new(),
            store_slot,
            Arc::new(crate::notifications::HeadlessNotifier),
            metrics.clone(),
        ));
        bus.spawn_handler("in-app", dispatcher.handler());

        let handle = listener.start();

        tx.send(json!({ "type": "INSERT", "table": "orders", "record": order_row("pending") }).to_string())
            .unwrap();
        tx.send(
            json!({
                "type": "UPDATE",
                "table": "orders",
                "record": order_row("pending"),
                "old_record": order_row("pending")
            })
            .to_string(),
        )
        .unwrap();
        tx.send("{ not json".to_string()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;

        let stored = store.notifications();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].body.contains("abc12345"));
        assert!(stored[0].body.contains("150"));
        assert_eq!(metrics.realtime_changes.with_label_values(&["ignored"]).get(), 1);
        assert_eq!(metrics.realtime_changes.with_label_values(&["malformed"]).get(), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_connection_resubscribes() {
        let (feed, tx) = ScriptedFeed::new(vec![]);
        let (listener, metrics, _bus) = listener(feed.clone(), RetryConfig::realtime());
        let handle = listener.start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(tx);
        tokio::time::sleep(Duration::from_secs(6)).await;

        {
            let log = feed.log();
            assert_eq!(log.subscribed_at.len(), 2);
            assert_eq!(open_channels(&log), vec![1]);
        }
        assert_eq!(metrics.realtime_retries.get(), 1);

        handle.shutdown().await;
    }

    struct PromptingNotifier {
        requests: AtomicUsize,
    }

    #[async_trait]
    impl NativeNotifier for PromptingNotifier {
        fn permission(&self) -> NotificationPermission {
            NotificationPermission::Default
        }

        async fn request_permission(&self) -> NotificationPermission {
            self.requests.fetch_add(1, Ordering::SeqCst);
            NotificationPermission::Granted
        }

        fn show(&self, _notification: &NativeNotification) -> Result<(), NativeNotificationError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_requested_once_across_retries() {
        let (feed, _tx) = ScriptedFeed::new(vec![
            SubscriptionStatus::TimedOut,
            SubscriptionStatus::TimedOut,
        ]);
        let notifier = Arc::new(PromptingNotifier { requests: AtomicUsize::new(0) });
        let (listener, _metrics, _bus) = listener(feed, RetryConfig::realtime());
        let handle = listener.with_permission_prompt(notifier.clone()).start();

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(notifier.requests.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_update_reaches_in_app_store_when_telegram_fails() {
        use crate::models::Employee;
        use crate::store::memory::MemoryStore;
        use crate::telegram::testing::RecordingSender;
        use crate::telegram::TelegramRelay;

        let (feed, tx) = ScriptedFeed::new(vec![]);
        let (listener, metrics, bus) = listener(feed, RetryConfig::realtime());

        let store_slot: SinkSlot<dyn NotificationSink> = SinkSlot::new();
        let store = Arc::new(NotificationStore::load(Arc::new(MemoryStorage::default())));
        let _registration = store_slot.register(store.clone());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            SinkSlot::new(),
            store_slot,
            Arc::new(crate::notifications::HeadlessNotifier),
            metrics.clone(),
        ));
        bus.spawn_handler("in-app", dispatcher.handler());

        let directory = Arc::new(MemoryStore::default().with_employee(Employee {
            id: "e1".to_string(),
            name: "Hana".to_string(),
            phone: Some("+251912345678".to_string()),
            telegram_chat_id: Some(4242),
            company_id: None,
        }));
        let sender = Arc::new(RecordingSender::failing());
        let relay = Arc::new(TelegramRelay::new(directory, sender, metrics.clone()));
        bus.spawn_handler("telegram", relay.handler());

        let handle = listener.start();

        let row = |status: &str| {
            let mut row = order_row(status);
            row["employee_id"] = json!("e1");
            row
        };
        tx.send(
            json!({
                "type": "UPDATE",
                "table": "orders",
                "record": row("delivering"),
                "old_record": row("preparing")
            })
            .to_string(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;

        let stored = store.notifications();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Order status updated");
        assert!(stored[0].body.contains("delivering"));
        assert_eq!(metrics.telegram_messages.with_label_values(&["failed"]).get(), 1);
        assert_eq!(metrics.telegram_messages.with_label_values(&["sent"]).get(), 0);

        handle.shutdown().await;
    }
}
