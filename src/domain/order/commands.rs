use serde::Deserialize;
use super::value_objects::OrderItem;

// ============================================================================
// Order Commands - Represent operator / employee intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    PlaceOrder(NewOrder),
    AdvanceStatus { order_id: String },
}

/// An order as submitted by the ordering screen, before the store assigns an id
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub company_id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub floor: String,
    pub items: Vec<OrderItem>,
}
