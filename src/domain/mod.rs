// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - order:    status pipeline, line items, order commands
// - employee: phone normalisation for Telegram linking, roles
//
// This layer has no knowledge of the change feed or of notification sinks.
//
// ============================================================================

pub mod order;
pub mod employee;
