// ============================================================================
// Core Actor Abstractions
// ============================================================================
//
// Types shared between the infrastructure actors and the components that
// report to them.
//
// ============================================================================

pub mod health;

pub use health::*;
