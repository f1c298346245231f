use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Delivery pipeline: pending → preparing → delivering → delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Delivering,
    Delivered,
}

/// Result of asking the pipeline for the next step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advanced { from: OrderStatus, to: OrderStatus },
    AlreadyTerminal,
}

impl OrderStatus {
    pub const PIPELINE: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Delivering,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// The single forward step allowed from this status
    pub fn advance(&self) -> Transition {
        if self.is_terminal() {
            return Transition::AlreadyTerminal;
        }

        let position = Self::PIPELINE
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::PIPELINE.len() - 1);

        match Self::PIPELINE.get(position + 1) {
            Some(next) => Transition::Advanced { from: *self, to: *next },
            None => Transition::AlreadyTerminal,
        }
    }

    /// Advance a status read from the store as raw text
    pub fn advance_raw(raw: &str) -> Result<Transition, OrderError> {
        Ok(raw.parse::<OrderStatus>()?.advance())
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "delivering" => Ok(OrderStatus::Delivering),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(OrderError::InvalidState(other.to_string())),
        }
    }
}

/// One menu item line on an order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    #[serde(rename = "itemId", alias = "item_id", alias = "id")]
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(alias = "unit_price")]
    pub price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Line items as stored on an order row.
///
/// The store hands items back either as a JSON array or as a string holding
/// encoded JSON. Both are accepted; anything unparseable becomes an empty
/// list so a single bad row never takes a consumer down.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct OrderItems(pub Vec<OrderItem>);

impl OrderItems {
    pub fn from_value(value: &Value) -> Self {
        let parsed = match value {
            Value::Null => return Self::default(),
            Value::String(encoded) => serde_json::from_str::<Vec<OrderItem>>(encoded),
            other => serde_json::from_value::<Vec<OrderItem>>(other.clone()),
        };

        match parsed {
            Ok(items) => Self(items),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed order items");
                Self::default()
            }
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(OrderItem::subtotal).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrderItem> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for OrderItems {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Price as shown in messages: whole amounts without decimals, otherwise two places
pub fn display_price(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_advances_reach_delivered() {
        let mut status = OrderStatus::Pending;
        for _ in 0..3 {
            match status.advance() {
                Transition::Advanced { from, to } => {
                    assert_eq!(from, status);
                    status = to;
                }
                Transition::AlreadyTerminal => panic!("terminal too early at {status}"),
            }
        }
        assert_eq!(status, OrderStatus::Delivered);
        assert!(status.is_terminal());
        assert_eq!(status.advance(), Transition::AlreadyTerminal);
    }

    #[test]
    fn test_display_price() {
        assert_eq!(display_price(150.0), "150");
        assert_eq!(display_price(42.5), "42.50");
    }

    #[test]
    fn test_no_skips() {
        assert_eq!(
            OrderStatus::Preparing.advance(),
            Transition::Advanced { from: OrderStatus::Preparing, to: OrderStatus::Delivering }
        );
    }

    #[test]
    fn test_unknown_status_is_invalid_state() {
        let err = OrderStatus::advance_raw("cancelled").unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(s) if s == "cancelled"));
    }

    #[test]
    fn test_status_round_trips_as_lowercase() {
        assert_eq!(serde_json::to_string(&OrderStatus::Delivering).unwrap(), "\"delivering\"");
        let parsed: OrderStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, OrderStatus::Pending);
    }

    #[test]
    fn test_items_accept_array_and_encoded_string() {
        let array = serde_json::json!([{ "itemId": "m1", "name": "Macchiato", "quantity": 2, "price": 40.0 }]);
        let encoded = Value::String(array.to_string());

        let from_array = OrderItems::from_value(&array);
        let from_string = OrderItems::from_value(&encoded);

        assert_eq!(from_array, from_string);
        assert_eq!(from_array.total(), 80.0);
    }

    #[test]
    fn test_malformed_items_become_empty() {
        let items = OrderItems::from_value(&Value::String("[{not json".to_string()));
        assert!(items.is_empty());
        assert_eq!(items.total(), 0.0);
    }
}
