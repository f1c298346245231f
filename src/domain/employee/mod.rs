// ============================================================================
// Employee Domain
// ============================================================================
//
// - Value objects (PhoneNumber normalisation, Role)
// - Errors (PhoneError, UnknownRole)
//
// Employee and company records themselves live in the external store and are
// read through `store::Directory`.
//
// ============================================================================

pub mod value_objects;
pub mod errors;

pub use value_objects::*;
pub use errors::*;
