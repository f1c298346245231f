use std::fmt::{self, Debug, Display};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::employee::Role;
use crate::utils::RetryConfig;

// ============================================================================
// Configuration
// ============================================================================
//
// Everything is read from the environment (a `.env` file is loaded first by
// the binaries). Invalid values are logged and replaced by the default; only
// DATABASE_URL is mandatory.
//
// ============================================================================

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_STORE_DIR: &str = "./data";
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_SUBSCRIBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// A value that never shows up in logs or debug output
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Secret<String>,
    pub database_max_connections: u32,
    pub http_port: u16,
    /// Absent token disables the Telegram relay and the bot
    pub telegram_bot_token: Option<Secret<String>>,
    pub telegram_api_base: String,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` on the bot webhook
    pub telegram_webhook_secret: Option<Secret<String>>,
    /// Expected `X-Order-Hook-Secret` on the order change push endpoint
    pub order_hook_secret: Option<Secret<String>>,
    pub telegram_poll_timeout: Duration,
    pub notification_store_dir: PathBuf,
    pub realtime_retry_delay: Duration,
    /// None retries forever
    pub realtime_max_retries: Option<u32>,
    pub realtime_subscribe_timeout: Duration,
    /// Role of the operator this instance notifies in-app
    pub notify_role: Role,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").map(Secret::new).ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let telegram_bot_token = var("TELEGRAM_BOT_TOKEN").map(Secret::new);
        if telegram_bot_token.is_none() {
            tracing::warn!("🪛️ TELEGRAM_BOT_TOKEN is not set. Telegram messages are disabled.");
        }

        let telegram_webhook_secret = var("TELEGRAM_WEBHOOK_SECRET").map(Secret::new);
        if telegram_webhook_secret.is_none() {
            tracing::warn!("🪛️ TELEGRAM_WEBHOOK_SECRET is not set. The bot webhook accepts unsigned calls.");
        }

        let order_hook_secret = var("ORDER_HOOK_SECRET").map(Secret::new);
        if order_hook_secret.is_none() {
            tracing::warn!("🪛️ ORDER_HOOK_SECRET is not set. The order change hook accepts unsigned calls.");
        }

        let telegram_api_base = var("TELEGRAM_API_BASE")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string());

        let notification_store_dir = var("NOTIFICATION_STORE_DIR").map(PathBuf::from).unwrap_or_else(|| {
            tracing::info!("🪛️ NOTIFICATION_STORE_DIR is not set, using {DEFAULT_STORE_DIR}");
            PathBuf::from(DEFAULT_STORE_DIR)
        });

        let realtime_max_retries = var("REALTIME_MAX_RETRIES").and_then(|s| match s.parse::<u32>() {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::error!("🪛️ {s} is not a valid REALTIME_MAX_RETRIES. {e} Retrying without a bound instead.");
                None
            }
        });

        let notify_role = var("NOTIFY_ROLE")
            .and_then(|s| match s.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::error!("🪛️ {e}. Falling back to admin for NOTIFY_ROLE.");
                    None
                }
            })
            .unwrap_or(Role::Admin);

        Ok(Self {
            database_url,
            database_max_connections: parsed(&var, "DATABASE_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            http_port: parsed(&var, "HTTP_PORT", DEFAULT_HTTP_PORT),
            telegram_bot_token,
            telegram_api_base,
            telegram_webhook_secret,
            order_hook_secret,
            telegram_poll_timeout: Duration::from_secs(parsed(
                &var,
                "TELEGRAM_POLL_TIMEOUT_SECS",
                DEFAULT_POLL_TIMEOUT_SECS,
            )),
            notification_store_dir,
            realtime_retry_delay: Duration::from_secs(parsed(
                &var,
                "REALTIME_RETRY_DELAY_SECS",
                DEFAULT_RETRY_DELAY_SECS,
            )),
            realtime_max_retries,
            realtime_subscribe_timeout: Duration::from_secs(parsed(
                &var,
                "REALTIME_SUBSCRIBE_TIMEOUT_SECS",
                DEFAULT_SUBSCRIBE_TIMEOUT_SECS,
            )),
            notify_role,
        })
    }

    /// Fixed-delay policy for the realtime subscription
    pub fn realtime_retry(&self) -> RetryConfig {
        RetryConfig::fixed(self.realtime_retry_delay, self.realtime_max_retries)
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(name) {
        Some(s) => s.parse::<T>().unwrap_or_else(|e| {
            tracing::error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        None => default,
    }
}
