// ============================================================================
// Realtime Module - order change feed
// ============================================================================
//
// - change:   raw `{type, record, old_record}` payloads and their
//             normalisation into bus events
// - feed:     the ChangeFeed / FeedChannel seam over the external store
// - postgres: LISTEN/NOTIFY implementation of the feed
// - listener: the retrying subscription loop that publishes to the bus
//
// ============================================================================

mod change;
mod feed;
mod listener;
mod postgres;

pub use change::{normalize, ChangeError, ChangeType, RawChange};
pub use feed::{ChangeFeed, FeedChannel, SubscriptionStatus};
pub use listener::{ListenerHandle, RealtimeListener};
pub use postgres::{PgChangeFeed, ORDER_CHANGE_CHANNEL};
