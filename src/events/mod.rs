//! In-process fan-out of order changes.
//!
//! The realtime listener is the only publisher. Each consumer (in-app
//! notifications, Telegram relay) runs as an independent handler task, so a
//! failing consumer never holds up or takes down another.
mod bus;
mod event_types;

pub use bus::{EventBus, Handler};
pub use event_types::*;
