// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure for asynchronous, concurrent operations.
//
// Structure:
// - core/           - Health status types
// - infrastructure/ - Concrete infrastructure actors (health monitor)
//
// Note: Order handling uses the command handler and the event bus, NOT actors.
//       Actors are reserved for infrastructure concerns only.
//
// ============================================================================

mod core;
mod infrastructure;

pub use core::{ComponentHealth, HealthStatus};
pub use infrastructure::{
    GetSystemHealth, HealthMonitorActor, SystemHealth, UpdateHealth, REALTIME_COMPONENT,
    TELEGRAM_COMPONENT,
};
