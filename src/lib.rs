//! Order status notifications for an office snack ordering service.
//!
//! Order rows change in Postgres; a realtime listener turns those changes
//! into notifications for operators (in-app store, toasts, native popups)
//! and into Telegram messages for the employee who placed the order.

pub mod actors;
pub mod config;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod realtime;
pub mod store;
pub mod telegram;
pub mod utils;
