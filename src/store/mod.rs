// ============================================================================
// External Store Access
// ============================================================================
//
// The relational store is owned elsewhere; this service reaches it only
// through the two traits below. `PgStore` is the production implementation.
//
// - OrderRepository: order inserts and status updates
// - Directory:       read-mostly lookups of employees and companies
//
// ============================================================================

mod postgres;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::domain::order::{NewOrder, OrderStatus};
use crate::models::{Employee, Order};

pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not decode {column}: {reason}")]
    Decode { column: &'static str, reason: String },
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order in `pending` status and return the stored row
    async fn insert_order(&self, order: &NewOrder, total_price: f64) -> Result<Order, StoreError>;

    /// Raw status text of an order, None if the order does not exist
    async fn order_status(&self, order_id: &str) -> Result<Option<String>, StoreError>;

    /// Set the status and updated-at timestamp. Returns false if no row matched.
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn employee(&self, employee_id: &str) -> Result<Option<Employee>, StoreError>;

    async fn company_name(&self, company_id: &str) -> Result<Option<String>, StoreError>;

    async fn employee_by_chat_id(&self, chat_id: i64) -> Result<Option<Employee>, StoreError>;

    /// Attach a chat id to the employee whose stored phone equals any variant
    async fn link_chat_by_phone(
        &self,
        phone_variants: &[String],
        chat_id: i64,
    ) -> Result<Option<Employee>, StoreError>;

    async fn latest_order_for_employee(&self, employee_id: &str) -> Result<Option<Order>, StoreError>;
}
