use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::Secret;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

use super::types::Update;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Extra time on top of a long-poll timeout before the HTTP call is abandoned
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Could not initialize Telegram client: {0}")]
    Initialization(String),
    #[error("Telegram request failed: {0}")]
    Transport(String),
    #[error("Telegram rejected the call ({code:?}): {description}")]
    Api { code: Option<i64>, description: String },
    #[error("Could not deserialize Telegram response: {0}")]
    Decode(String),
    #[error("Telegram circuit breaker is open")]
    CircuitOpen,
}

/// Outbound half of the Bot API
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError>;
}

/// Inbound half of the Bot API, as used by the long-polling bot
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError>;
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: Secret<String>,
    breaker: Arc<CircuitBreaker>,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: Secret<String>) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TelegramError::Initialization(e.to_string()))?;
        let breaker = Arc::new(CircuitBreaker::new("telegram", CircuitBreakerConfig::default()));
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            breaker,
        })
    }

    /// Breaker guarding every call, shared with the health monitor
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token.reveal())
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = async {
            tracing::trace!(method, "Calling Telegram Bot API");
            let response = self
                .client
                .post(self.url(method))
                .json(body)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| TelegramError::Transport(e.without_url().to_string()))?;

            let status = response.status();
            let parsed = response
                .json::<ApiResponse<T>>()
                .await
                .map_err(|e| TelegramError::Decode(format!("{status}: {}", e.without_url())))?;

            settle(status.as_u16(), parsed)
        };

        self.guarded(request).await
    }

    /// Run a request through the breaker. The request resolves to
    /// `Ok(Err(_))` for failures that must not trip it.
    async fn guarded<T, F>(&self, request: F) -> Result<T, TelegramError>
    where
        F: Future<Output = Result<Result<T, TelegramError>, TelegramError>>,
    {
        match self.breaker.call(request).await {
            Ok(settled) => settled,
            Err(CircuitBreakerError::CircuitOpen) => Err(TelegramError::CircuitOpen),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }
}

/// Rejections tied to one chat (bot blocked, chat not found)
fn is_recipient_error(code: Option<i64>) -> bool {
    matches!(code, Some(400) | Some(403))
}

/// Split an API answer into the result, a per-chat rejection (inner error)
/// or a failure of the API itself (outer error, counted by the breaker).
fn settle<T>(status: u16, parsed: ApiResponse<T>) -> Result<Result<T, TelegramError>, TelegramError> {
    match (parsed.ok, parsed.result) {
        (true, Some(result)) => Ok(Ok(result)),
        _ => {
            let code = parsed.error_code.or(Some(i64::from(status)));
            let error = TelegramError::Api {
                code,
                description: parsed.description.unwrap_or_else(|| "no description".to_string()),
            };
            if is_recipient_error(code) {
                Ok(Err(error))
            } else {
                Err(error)
            }
        }
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let body = SendMessage { chat_id, text, parse_mode: "HTML" };
        let _: serde_json::Value = self.call("sendMessage", &body, REQUEST_TIMEOUT).await?;
        tracing::debug!(chat_id, "📨 Telegram message sent");
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        let body = GetUpdates { offset, timeout: timeout.as_secs(), allowed_updates: ["message"] };
        self.call("getUpdates", &body, timeout + POLL_GRACE).await
    }
}
