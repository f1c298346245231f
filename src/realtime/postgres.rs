use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPool};

use super::feed::{ChangeFeed, FeedChannel, SubscriptionStatus};

/// Channel the `notify_order_change` trigger publishes on
pub const ORDER_CHANGE_CHANNEL: &str = "order_changes";

/// Change feed over Postgres LISTEN/NOTIFY.
///
/// Each channel opens its own listener connection from the pool options, so
/// closing a channel never disturbs pooled query connections.
#[derive(Clone)]
pub struct PgChangeFeed {
    pool: PgPool,
    channel: String,
    subscribe_timeout: Duration,
}

impl PgChangeFeed {
    pub fn new(pool: PgPool, subscribe_timeout: Duration) -> Self {
        Self {
            pool,
            channel: ORDER_CHANGE_CHANNEL.to_string(),
            subscribe_timeout,
        }
    }
}

impl ChangeFeed for PgChangeFeed {
    fn channel(&self) -> Box<dyn FeedChannel> {
        Box::new(PgFeedChannel {
            pool: self.pool.clone(),
            channel: self.channel.clone(),
            subscribe_timeout: self.subscribe_timeout,
            listener: None,
        })
    }
}

struct PgFeedChannel {
    pool: PgPool,
    channel: String,
    subscribe_timeout: Duration,
    listener: Option<PgListener>,
}

#[async_trait]
impl FeedChannel for PgFeedChannel {
    async fn subscribe(&mut self) -> SubscriptionStatus {
        let attempt = async {
            let mut listener = PgListener::connect_with(&self.pool).await?;
            listener.listen(&self.channel).await?;
            Ok::<_, sqlx::Error>(listener)
        };

        match tokio::time::timeout(self.subscribe_timeout, attempt).await {
            Ok(Ok(listener)) => {
                tracing::debug!(channel = %self.channel, "🎧 LISTEN established");
                self.listener = Some(listener);
                SubscriptionStatus::Subscribed
            }
            Ok(Err(e)) => SubscriptionStatus::ChannelError(e.to_string()),
            Err(_) => SubscriptionStatus::TimedOut,
        }
    }

    async fn next_change(&mut self) -> Option<String> {
        let listener = self.listener.as_mut()?;

        // try_recv yields Ok(None) when the connection drops. Surface that as
        // the end of this channel and let the listener loop resubscribe.
        match listener.try_recv().await {
            Ok(Some(notification)) => Some(notification.payload().to_string()),
            Ok(None) => {
                tracing::warn!(channel = %self.channel, "🎧 Listener connection lost");
                None
            }
            Err(e) => {
                tracing::warn!(channel = %self.channel, error = %e, "🎧 Listener receive failed");
                None
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = listener.unlisten_all().await {
                tracing::debug!(channel = %self.channel, error = %e, "UNLISTEN failed, dropping connection");
            }
        }
    }
}
