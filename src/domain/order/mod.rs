// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (OrderStatus pipeline, OrderItem, OrderItems)
// - Commands (PlaceOrder, AdvanceStatus)
// - Errors (OrderError enum)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod command_handler;

pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use command_handler::*;
