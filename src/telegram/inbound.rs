use std::sync::Arc;

use crate::domain::employee::PhoneNumber;
use crate::metrics::Metrics;
use crate::store::Directory;

use super::client::MessageSender;
use super::format;
use super::types::InboundMessage;

// ============================================================================
// Inbound Bot Messages
// ============================================================================
//
// Shared by the webhook route and the long-polling bot:
// - /start  greeting and phone prompt
// - /help   command list
// - /status linked employee's latest order
// - anything else is treated as a phone number to register
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Status,
    /// Free text, expected to be a phone number
    Text(String),
}

impl BotCommand {
    /// `/cmd`, `/cmd@botname` and `/cmd payload` are all the same command
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let command = trimmed
            .split_whitespace()
            .next()
            .and_then(|word| word.strip_prefix('/'))
            .map(|word| word.split('@').next().unwrap_or(word).to_ascii_lowercase());

        match command.as_deref() {
            Some("start") => BotCommand::Start,
            Some("help") => BotCommand::Help,
            Some("status") => BotCommand::Status,
            _ => BotCommand::Text(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Nothing to answer (no text, no contact)
    Ignored,
    Replied {
        /// Employee id linked to this chat by the message
        registered: Option<String>,
        delivered: bool,
    },
}

struct Reply {
    text: String,
    registered: Option<String>,
}

impl Reply {
    fn text(text: String) -> Self {
        Self { text, registered: None }
    }
}

pub struct InboundHandler {
    directory: Arc<dyn Directory>,
    sender: Arc<dyn MessageSender>,
    metrics: Arc<Metrics>,
}

impl InboundHandler {
    pub fn new(directory: Arc<dyn Directory>, sender: Arc<dyn MessageSender>, metrics: Arc<Metrics>) -> Self {
        Self { directory, sender, metrics }
    }

    pub async fn handle(&self, message: &InboundMessage) -> InboundOutcome {
        let chat_id = message.chat.id;

        let reply = if let Some(contact) = &message.contact {
            self.register(chat_id, &contact.phone_number).await
        } else if let Some(text) = message.text.as_deref() {
            match BotCommand::parse(text) {
                BotCommand::Start => Reply::text(format::welcome_message(message.first_name())),
                BotCommand::Help => Reply::text(format::help_message()),
                BotCommand::Status => self.status(chat_id).await,
                BotCommand::Text(text) => self.register(chat_id, &text).await,
            }
        } else {
            return InboundOutcome::Ignored;
        };

        let delivered = match self.sender.send_message(chat_id, &reply.text).await {
            Ok(()) => {
                self.metrics.record_telegram("reply");
                true
            }
            Err(e) => {
                self.metrics.record_telegram("failed");
                tracing::warn!(chat_id, error = %e, "Could not answer Telegram message");
                false
            }
        };

        InboundOutcome::Replied { registered: reply.registered, delivered }
    }

    async fn register(&self, chat_id: i64, input: &str) -> Reply {
        let phone = match PhoneNumber::parse(input) {
            Ok(phone) => phone,
            Err(e) => {
                tracing::debug!(chat_id, error = %e, "Inbound text is not a phone number");
                return Reply::text(format::invalid_phone_message());
            }
        };

        match self.directory.link_chat_by_phone(&phone.variants(), chat_id).await {
            Ok(Some(employee)) => {
                tracing::info!(chat_id, employee_id = %employee.id, "🔗 Telegram chat linked to employee");
                Reply { text: format::registered_message(&employee.name), registered: Some(employee.id) }
            }
            Ok(None) => {
                tracing::info!(chat_id, phone = %phone.as_str(), "No employee matches registration phone");
                Reply::text(format::phone_not_found_message())
            }
            Err(e) => {
                tracing::error!(chat_id, error = %e, "❌ Phone registration failed");
                Reply::text(format::unavailable_message())
            }
        }
    }

    async fn status(&self, chat_id: i64) -> Reply {
        let employee = match self.directory.employee_by_chat_id(chat_id).await {
            Ok(Some(employee)) => employee,
            Ok(None) => return Reply::text(format::not_linked_message()),
            Err(e) => {
                tracing::error!(chat_id, error = %e, "❌ Employee lookup by chat failed");
                return Reply::text(format::unavailable_message());
            }
        };

        let order = match self.directory.latest_order_for_employee(&employee.id).await {
            Ok(Some(order)) => order,
            Ok(None) => return Reply::text(format::no_orders_message(&employee.name)),
            Err(e) => {
                tracing::error!(chat_id, error = %e, "❌ Latest order lookup failed");
                return Reply::text(format::unavailable_message());
            }
        };

        let company_name = match order.company_id.as_deref() {
            Some(company_id) => self.directory.company_name(company_id).await.unwrap_or_else(|e| {
                tracing::warn!(company_id, error = %e, "Company lookup failed, omitting company line");
                None
            }),
            None => None,
        };

        Reply::text(format::order_status_message(&order, &employee.name, company_name.as_deref()))
    }
}
