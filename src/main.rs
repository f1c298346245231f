use futures_util::future::join_all;
use kameo::Actor;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use office_order_notify::actors::HealthMonitorActor;
use office_order_notify::config::Config;
use office_order_notify::domain::order::OrderCommandHandler;
use office_order_notify::events::{EventBus, OrderChange};
use office_order_notify::metrics::{self, AppState, Metrics};
use office_order_notify::notifications::{
    FileStorage, HeadlessNotifier, NativeNotifier, NotificationDispatcher, NotificationSink, NotificationStore,
    SinkSlot, ToastQueue, ToastSink,
};
use office_order_notify::realtime::{PgChangeFeed, RealtimeListener};
use office_order_notify::store::PgStore;
use office_order_notify::telegram::{InboundHandler, TelegramClient, TelegramRelay};

const EVENT_BUS_CAPACITY: usize = 256;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,office_order_notify=debug"))
        )
        .init();

    dotenvy::dotenv().ok();

    tracing::info!("🚀 Starting office order notifications");

    let config = Config::from_env()?;

    // === 1. Store ===
    let store = Arc::new(PgStore::connect(config.database_url.reveal(), config.database_max_connections).await?);
    store.apply_schema().await?;

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Telegram client (optional) ===
    let telegram = match &config.telegram_bot_token {
        Some(token) => Some(Arc::new(TelegramClient::new(&config.telegram_api_base, token.clone())?)),
        None => None,
    };

    // === 4. Health monitor ===
    let health = HealthMonitorActor::spawn(HealthMonitorActor::new(
        telegram.as_ref().map(|client| client.breaker()),
        metrics.clone(),
    ));

    // === 5. Event bus and consumers ===
    let bus: EventBus<OrderChange> = EventBus::new(EVENT_BUS_CAPACITY);
    let native: Arc<dyn NativeNotifier> = Arc::new(HeadlessNotifier);
    let mut consumers = Vec::new();

    let in_app = if config.notify_role.receives_order_notifications() {
        let notifications = Arc::new(NotificationStore::load(Arc::new(FileStorage::new(
            &config.notification_store_dir,
        ))));
        let toasts = Arc::new(ToastQueue::new());

        let store_slot: SinkSlot<dyn NotificationSink> = SinkSlot::new();
        let toast_slot: SinkSlot<dyn ToastSink> = SinkSlot::new();
        let registrations = (
            store_slot.register(notifications.clone() as Arc<dyn NotificationSink>),
            toast_slot.register(toasts.clone() as Arc<dyn ToastSink>),
        );

        let dispatcher = Arc::new(NotificationDispatcher::new(
            toast_slot,
            store_slot,
            native.clone(),
            metrics.clone(),
        ));
        consumers.push(bus.spawn_handler("in-app", dispatcher.handler()));
        tracing::info!(role = ?config.notify_role, "🔔 In-app notifications enabled");

        Some((notifications, toasts, registrations))
    } else {
        tracing::info!(role = ?config.notify_role, "🔕 Role does not receive in-app notifications");
        None
    };

    let (relay, inbound) = match &telegram {
        Some(client) => {
            let relay = Arc::new(TelegramRelay::new(store.clone(), client.clone(), metrics.clone()));
            consumers.push(bus.spawn_handler("telegram", relay.clone().handler()));
            let inbound = Arc::new(InboundHandler::new(store.clone(), client.clone(), metrics.clone()));
            tracing::info!("📨 Telegram relay enabled");
            (Some(relay), Some(inbound))
        }
        None => (None, None),
    };

    // === 6. Realtime listener ===
    let feed = Arc::new(PgChangeFeed::new(store.pool().clone(), config.realtime_subscribe_timeout));
    let mut listener = RealtimeListener::new(feed, bus.clone(), config.realtime_retry(), metrics.clone())
        .with_health(health.clone());
    if in_app.is_some() {
        listener = listener.with_permission_prompt(native);
    }
    let listener = listener.start();

    // === 7. HTTP server ===
    let state = AppState {
        metrics: metrics.clone(),
        health,
        orders: Arc::new(OrderCommandHandler::new(store.clone())),
        relay,
        inbound,
        notifications: in_app.as_ref().map(|(notifications, _, _)| notifications.clone()),
        toasts: in_app.as_ref().map(|(_, toasts, _)| toasts.clone()),
        telegram_webhook_secret: config.telegram_webhook_secret.clone(),
        order_hook_secret: config.order_hook_secret.clone(),
    };
    let server = metrics::start_http_server(state, config.http_port)?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tracing::info!("✅ Listening for order changes. Press Ctrl-C to stop.");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Could not listen for Ctrl-C, shutting down");
            }
        }
        result = server_task => {
            match result {
                Ok(Ok(())) => tracing::warn!("HTTP server stopped"),
                Ok(Err(e)) => tracing::error!(error = %e, "❌ HTTP server error"),
                Err(e) => tracing::error!(error = %e, "❌ HTTP server task failed"),
            }
        }
    }

    // === 8. Shutdown ===
    tracing::info!("🛑 Shutting down");
    listener.shutdown().await;
    server_handle.stop(true).await;

    // Consumers finish queued changes once the last bus sender is gone
    drop(bus);
    if tokio::time::timeout(DRAIN_TIMEOUT, join_all(consumers)).await.is_err() {
        tracing::warn!("Event consumers did not drain in time");
    }
    drop(in_app);

    tracing::info!("👋 Stopped");
    Ok(())
}
