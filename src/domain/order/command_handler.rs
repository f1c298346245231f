use std::sync::Arc;

use serde::Serialize;

use super::commands::{NewOrder, OrderCommand};
use super::errors::OrderError;
use super::value_objects::{OrderItems, OrderStatus, Transition};
use crate::models::Order;
use crate::store::OrderRepository;

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → validation → store mutation
//
// The handler never emits notifications itself. Whoever is listening to the
// change feed observes the resulting row change.
//
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Placed { order: Order },
    Advanced { order_id: String, from: OrderStatus, to: OrderStatus },
    AlreadyDelivered { order_id: String },
}

pub struct OrderCommandHandler {
    repository: Arc<dyn OrderRepository>,
}

impl OrderCommandHandler {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, command: OrderCommand) -> Result<CommandOutcome, OrderError> {
        match command {
            OrderCommand::PlaceOrder(new_order) => self.place_order(new_order).await,
            OrderCommand::AdvanceStatus { order_id } => self.advance_status(order_id).await,
        }
    }

    async fn place_order(&self, new_order: NewOrder) -> Result<CommandOutcome, OrderError> {
        validate_items(&new_order)?;

        let total_price = OrderItems(new_order.items.clone()).total();
        let order = self
            .repository
            .insert_order(&new_order, total_price)
            .await
            .map_err(|e| OrderError::Store(e.to_string()))?;

        tracing::info!(
            order_id = %order.id,
            employee_id = %new_order.employee_id,
            total_price,
            "Order placed"
        );

        Ok(CommandOutcome::Placed { order })
    }

    async fn advance_status(&self, order_id: String) -> Result<CommandOutcome, OrderError> {
        let raw_status = self
            .repository
            .order_status(&order_id)
            .await
            .map_err(|e| OrderError::Store(e.to_string()))?
            .ok_or_else(|| OrderError::NotFound(order_id.clone()))?;

        match OrderStatus::advance_raw(&raw_status)? {
            Transition::AlreadyTerminal => {
                tracing::debug!(order_id = %order_id, "Order already delivered, nothing to advance");
                Ok(CommandOutcome::AlreadyDelivered { order_id })
            }
            Transition::Advanced { from, to } => {
                let updated = self
                    .repository
                    .update_status(&order_id, to)
                    .await
                    .map_err(|e| OrderError::Store(e.to_string()))?;

                if !updated {
                    return Err(OrderError::NotFound(order_id));
                }

                tracing::info!(
                    order_id = %order_id,
                    from = %from,
                    to = %to,
                    "Order status advanced"
                );

                Ok(CommandOutcome::Advanced { order_id, from, to })
            }
        }
    }
}

fn validate_items(order: &NewOrder) -> Result<(), OrderError> {
    if order.items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    for item in &order.items {
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                item: item.name.clone(),
                quantity: item.quantity,
            });
        }
        if !item.price.is_finite() || item.price < 0.0 {
            return Err(OrderError::InvalidPrice {
                item: item.name.clone(),
                price: item.price,
            });
        }
    }

    Ok(())
}
