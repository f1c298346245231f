// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid order status: {0}")]
    InvalidState(String),

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item quantity for {item}: {quantity}")]
    InvalidQuantity { item: String, quantity: u32 },

    #[error("Invalid unit price for {item}: {price}")]
    InvalidPrice { item: String, price: f64 },

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order store failure: {0}")]
    Store(String),
}

impl OrderError {
    /// Whether the failure was caused by the caller rather than the store
    pub fn is_client_error(&self) -> bool {
        !matches!(self, OrderError::Store(_))
    }
}
