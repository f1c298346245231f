use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderItems, OrderStatus};

// ============================================================================
// Store Rows
// ============================================================================
//
// Shapes of the rows this service reads from the external store, either via
// queries or as snapshots carried by the change feed. Ids are opaque strings.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub items: OrderItems,
    pub total_price: f64,
    #[serde(default)]
    pub floor: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub employee_name: Option<String>,
}

impl Order {
    /// First eight characters of the id, as shown to people
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Employee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,
    #[serde(default)]
    pub company_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Company {
    pub id: String,
    pub name: String,
}
