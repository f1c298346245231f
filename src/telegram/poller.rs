use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::utils::RetryConfig;

use super::client::{TelegramError, UpdateSource};
use super::inbound::InboundHandler;
use super::types::Update;

/// Long-polling loop for the standalone bot.
///
/// Updates are acknowledged by advancing the offset past the highest
/// `update_id` seen, whether or not the reply could be delivered.
pub struct UpdatePoller {
    source: Arc<dyn UpdateSource>,
    handler: Arc<InboundHandler>,
    poll_timeout: Duration,
    retry: RetryConfig,
}

impl UpdatePoller {
    pub fn new(source: Arc<dyn UpdateSource>, handler: Arc<InboundHandler>, poll_timeout: Duration) -> Self {
        Self {
            source,
            handler,
            poll_timeout,
            retry: RetryConfig {
                max_attempts: None,
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
                multiplier: 2.0,
            },
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch and handle one batch. Returns the offset for the next call.
    pub async fn poll_once(&self, offset: Option<i64>) -> Result<Option<i64>, TelegramError> {
        let updates = self.source.get_updates(offset, self.poll_timeout).await?;
        Ok(self.handle_batch(offset, updates).await)
    }

    async fn handle_batch(&self, offset: Option<i64>, updates: Vec<Update>) -> Option<i64> {
        let mut next = offset;

        for update in updates {
            next = Some(next.map_or(update.update_id + 1, |n| n.max(update.update_id + 1)));

            match update.message {
                Some(message) => {
                    let outcome = self.handler.handle(&message).await;
                    tracing::debug!(update_id = update.update_id, ?outcome, "Handled Telegram update");
                }
                None => tracing::trace!(update_id = update.update_id, "Skipping update without message"),
            }
        }

        next
    }

    /// Poll until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Shutdown interrupts a pending fetch or backoff but never a batch in
    /// progress. The final offset is confirmed to the Bot API before
    /// returning so handled updates are not delivered again.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut offset = None;
        let mut confirmed = None;
        let mut backoff = self.retry.backoff();
        tracing::info!(poll_timeout = ?self.poll_timeout, "🤖 Telegram bot polling started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let fetched = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                fetched = self.source.get_updates(offset, self.poll_timeout) => fetched,
            };
            confirmed = offset;

            match fetched {
                Ok(updates) => {
                    offset = self.handle_batch(offset, updates).await;
                    backoff.reset();
                }
                Err(e) => {
                    let Some(delay) = backoff.next_delay() else {
                        tracing::error!(error = %e, "❌ Telegram polling retries exhausted, stopping");
                        break;
                    };
                    tracing::warn!(error = %e, retry_in = ?delay, "🔄 getUpdates failed, backing off");

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        if offset != confirmed {
            match self.source.get_updates(offset, Duration::ZERO).await {
                Ok(_) => tracing::debug!(?offset, "Confirmed handled Telegram updates"),
                Err(e) => tracing::warn!(?offset, error = %e, "Could not confirm handled Telegram updates"),
            }
        }

        tracing::info!("🤖 Telegram bot polling stopped");
    }
}
