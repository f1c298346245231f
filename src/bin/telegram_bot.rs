use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use office_order_notify::config::{Config, ConfigError};
use office_order_notify::metrics::Metrics;
use office_order_notify::store::PgStore;
use office_order_notify::telegram::{InboundHandler, TelegramClient, UpdatePoller};

/// Standalone long-polling bot: registers phone numbers and answers `/status`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,office_order_notify=debug,telegram_bot=debug"))
        )
        .init();

    dotenvy::dotenv().ok();

    tracing::info!("🤖 Starting Telegram bot");

    let config = Config::from_env()?;
    let token = config
        .telegram_bot_token
        .clone()
        .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

    let store = Arc::new(PgStore::connect(config.database_url.reveal(), config.database_max_connections).await?);
    let metrics = Arc::new(Metrics::new()?);
    let client = Arc::new(TelegramClient::new(&config.telegram_api_base, token)?);

    let handler = Arc::new(InboundHandler::new(store, client.clone(), metrics));
    let poller = UpdatePoller::new(client, handler, config.telegram_poll_timeout);

    let (stop, stopped) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("🛑 Ctrl-C received, stopping bot"),
            Err(e) => tracing::error!(error = %e, "Could not listen for Ctrl-C, stopping bot"),
        }
        let _ = stop.send(true);
    });

    poller.run(stopped).await;
    Ok(())
}
