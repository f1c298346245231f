// ============================================================================
// Infrastructure Actors
// ============================================================================
//
// - Health monitoring (component status aggregation, breaker polling)
//
// ============================================================================

mod health_monitor;

pub use health_monitor::{
    GetSystemHealth, HealthMonitorActor, SystemHealth, UpdateHealth, REALTIME_COMPONENT,
    TELEGRAM_COMPONENT,
};
