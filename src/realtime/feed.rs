use async_trait::async_trait;

/// Outcome of establishing a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Subscribed,
    ChannelError(String),
    TimedOut,
}

impl SubscriptionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionStatus::Subscribed => "subscribed",
            SubscriptionStatus::ChannelError(_) => "channel_error",
            SubscriptionStatus::TimedOut => "timed_out",
        }
    }
}

/// Source of order change channels
pub trait ChangeFeed: Send + Sync {
    /// A fresh, not yet subscribed channel
    fn channel(&self) -> Box<dyn FeedChannel>;
}

/// One subscription attempt against the feed.
///
/// A channel is used for a single subscription. After a failure or a lost
/// connection it is closed and a new one is requested from the feed.
#[async_trait]
pub trait FeedChannel: Send {
    async fn subscribe(&mut self) -> SubscriptionStatus;

    /// Next raw change payload. None once the channel is no longer usable.
    async fn next_change(&mut self) -> Option<String>;

    /// Release the subscription. Safe to call more than once.
    async fn close(&mut self);
}
