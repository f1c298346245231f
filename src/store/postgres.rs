use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::{Directory, OrderRepository, StoreError};
use crate::domain::order::{NewOrder, OrderItems, OrderStatus};
use crate::models::{Employee, Order};
use crate::utils::{retry_with_backoff, RetryConfig};

const ORDER_COLUMNS: &str = "id, items::text AS items, total_price, floor, status, created_at, \
                             updated_at, company_id, employee_id, employee_name";

const EMPLOYEE_COLUMNS: &str = "id, name, phone, telegram_chat_id, company_id";

/// Postgres-backed implementation of the store traits
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with retry; the database is often still starting when we are
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        tracing::info!("Connecting to Postgres...");

        let pool = retry_with_backoff(RetryConfig::aggressive(), |attempt| {
            tracing::debug!(attempt, "Opening Postgres pool");
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(database_url)
        })
        .await
        .into_result()?;

        tracing::info!("✅ Connected to Postgres");
        Ok(Self { pool })
    }

    /// Create tables and the change-feed trigger if they do not exist
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(include_str!("schema.sql")).execute(&self.pool).await?;
        tracing::info!("Schema applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let raw_status: String = row.try_get("status")?;
    let status = raw_status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::Decode { column: "status", reason: e.to_string() })?;

    let items: Option<String> = row.try_get("items")?;
    let items = items
        .map(|encoded| OrderItems::from_value(&Value::String(encoded)))
        .unwrap_or_default();

    Ok(Order {
        id: row.try_get("id")?,
        items,
        total_price: row.try_get("total_price")?,
        floor: row.try_get("floor")?,
        status,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get("updated_at")?,
        company_id: row.try_get("company_id")?,
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
    })
}

fn employee_from_row(row: &PgRow) -> Result<Employee, StoreError> {
    Ok(Employee {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        telegram_chat_id: row.try_get("telegram_chat_id")?,
        company_id: row.try_get("company_id")?,
    })
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert_order(&self, order: &NewOrder, total_price: f64) -> Result<Order, StoreError> {
        let items = serde_json::to_string(&order.items)
            .map_err(|e| StoreError::Decode { column: "items", reason: e.to_string() })?;

        let sql = format!(
            "INSERT INTO orders (items, total_price, floor, status, company_id, employee_id, employee_name) \
             VALUES ($1::jsonb, $2, $3, 'pending', $4, $5, $6) \
             RETURNING {ORDER_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(items)
            .bind(total_price)
            .bind(&order.floor)
            .bind(&order.company_id)
            .bind(&order.employee_id)
            .bind(&order.employee_name)
            .fetch_one(&self.pool)
            .await?;

        order_from_row(&row)
    }

    async fn order_status(&self, order_id: &str) -> Result<Option<String>, StoreError> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(status)
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status.as_str())
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn employee(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(employee_from_row).transpose()
    }

    async fn company_name(&self, company_id: &str) -> Result<Option<String>, StoreError> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM companies WHERE id = $1")
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn employee_by_chat_id(&self, chat_id: i64) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE telegram_chat_id = $1 LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(employee_from_row).transpose()
    }

    async fn link_chat_by_phone(
        &self,
        phone_variants: &[String],
        chat_id: i64,
    ) -> Result<Option<Employee>, StoreError> {
        let sql = format!(
            "UPDATE employees SET telegram_chat_id = $1 WHERE phone = ANY($2) RETURNING {EMPLOYEE_COLUMNS}"
        );
        let rows = sqlx::query(&sql)
            .bind(chat_id)
            .bind(phone_variants)
            .fetch_all(&self.pool)
            .await?;

        if rows.len() > 1 {
            tracing::warn!(
                chat_id,
                matched = rows.len(),
                "Phone number matched several employees, all were linked"
            );
        }

        rows.first().map(employee_from_row).transpose()
    }

    async fn latest_order_for_employee(&self, employee_id: &str) -> Result<Option<Order>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE employee_id = $1 ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }
}
