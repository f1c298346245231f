use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{Directory, OrderRepository, StoreError};
use crate::domain::order::{NewOrder, OrderItems, OrderStatus};
use crate::models::{Company, Employee, Order};

/// In-memory store used by unit tests across the crate
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub orders: Mutex<HashMap<String, (Order, String)>>,
    pub employees: Mutex<Vec<Employee>>,
    pub companies: Mutex<Vec<Company>>,
    pub fail_lookups: std::sync::atomic::AtomicBool,
    pub fail_company_lookups: std::sync::atomic::AtomicBool,
    next_id: AtomicU32,
}

impl MemoryStore {
    pub fn with_employee(self, employee: Employee) -> Self {
        self.employees.lock().unwrap().push(employee);
        self
    }

    pub fn with_company(self, id: &str, name: &str) -> Self {
        self.companies.lock().unwrap().push(Company { id: id.to_string(), name: name.to_string() });
        self
    }

    /// Seed an order whose stored status text is `raw_status` (may be invalid)
    pub fn with_order(self, order: Order, raw_status: &str) -> Self {
        self.orders
            .lock()
            .unwrap()
            .insert(order.id.clone(), (order, raw_status.to_string()));
        self
    }

    pub fn employee_snapshot(&self, id: &str) -> Option<Employee> {
        self.employees.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    fn check_lookups(&self) -> Result<(), StoreError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: &NewOrder, total_price: f64) -> Result<Order, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = Order {
            id: format!("order-{n:04}"),
            items: OrderItems(order.items.clone()),
            total_price,
            floor: Some(order.floor.clone()),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
            company_id: Some(order.company_id.clone()),
            employee_id: Some(order.employee_id.clone()),
            employee_name: Some(order.employee_name.clone()),
        };
        self.orders
            .lock()
            .unwrap()
            .insert(row.id.clone(), (row.clone(), "pending".to_string()));
        Ok(row)
    }

    async fn order_status(&self, order_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.orders.lock().unwrap().get(order_id).map(|(_, raw)| raw.clone()))
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<bool, StoreError> {
        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(order_id) {
            Some((order, raw)) => {
                order.status = status;
                order.updated_at = Some(Utc::now());
                *raw = status.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn employee(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
        self.check_lookups()?;
        Ok(self.employee_snapshot(employee_id))
    }

    async fn company_name(&self, company_id: &str) -> Result<Option<String>, StoreError> {
        self.check_lookups()?;
        if self.fail_company_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == company_id)
            .map(|c| c.name.clone()))
    }

    async fn employee_by_chat_id(&self, chat_id: i64) -> Result<Option<Employee>, StoreError> {
        self.check_lookups()?;
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.telegram_chat_id == Some(chat_id))
            .cloned())
    }

    async fn link_chat_by_phone(
        &self,
        phone_variants: &[String],
        chat_id: i64,
    ) -> Result<Option<Employee>, StoreError> {
        let mut employees = self.employees.lock().unwrap();
        let mut linked = None;
        for employee in employees.iter_mut() {
            let matches = employee
                .phone
                .as_ref()
                .map(|p| phone_variants.iter().any(|v| v == p))
                .unwrap_or(false);
            if matches {
                employee.telegram_chat_id = Some(chat_id);
                linked.get_or_insert_with(|| employee.clone());
            }
        }
        Ok(linked)
    }

    async fn latest_order_for_employee(&self, employee_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|(o, _)| o.employee_id.as_deref() == Some(employee_id))
            .max_by_key(|(o, _)| o.created_at)
            .map(|(o, _)| o.clone()))
    }
}
