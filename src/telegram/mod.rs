// ============================================================================
// Telegram Module
// ============================================================================
//
// - client:  Bot API transport (sendMessage, getUpdates) behind a breaker
// - format:  the one message template shared by every Telegram surface
// - relay:   status-change messages to linked employees
// - inbound: /start, /help, /status and phone self-registration
// - poller:  long-polling loop for the standalone bot process
//
// ============================================================================

mod client;
pub mod format;
mod inbound;
mod poller;
mod relay;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{MessageSender, TelegramClient, TelegramError, UpdateSource};
pub use inbound::{BotCommand, InboundHandler, InboundOutcome};
pub use poller::UpdatePoller;
pub use relay::{RelayOutcome, TelegramRelay};
pub use types::{Chat, Contact, InboundMessage, TelegramUser, Update};
