// ============================================================================
// Employee Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PhoneError {
    #[error("Phone number is empty")]
    Empty,

    #[error("Not an Ethiopian mobile number: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);
