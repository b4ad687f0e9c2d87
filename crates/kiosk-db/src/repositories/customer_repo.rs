//! Customer repository implementation
//!
//! Provides PostgreSQL-backed RFID lookups and the two-pool balance update.

use async_trait::async_trait;
use kiosk_core::{models::Customer, traits::CustomerStore, AppError, AppResult};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of CustomerStore
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    /// Create a new customer repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerRepository {
    #[instrument(skip(self))]
    async fn get_by_rfid(&self, rfid: &str) -> AppResult<Option<Customer>> {
        debug!("Finding customer by rfid: {}", rfid);

        let result = sqlx::query_as::<sqlx::Postgres, CustomerRow>(
            r#"
            SELECT
                id, rfid, name, email, phone,
                balance_main, balance_bonus, center_code
            FROM es_customer
            WHERE rfid = $1
            "#,
        )
        .bind(rfid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding customer {}: {}", rfid, e);
            AppError::Database(format!("Failed to find customer: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn update_balances(
        &self,
        customer_id: i32,
        new_main: i32,
        new_bonus: i32,
    ) -> AppResult<bool> {
        debug!(
            "Updating balances for customer {}: main={}, bonus={}",
            customer_id, new_main, new_bonus
        );

        let result = sqlx::query(
            r#"
            UPDATE es_customer
            SET balance_main = $2,
                balance_bonus = $3,
                updated_at_dt = NOW()
            WHERE id = $1
            "#,
        )
        .bind(customer_id)
        .bind(new_main)
        .bind(new_bonus)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error updating balances for customer {}: {}",
                customer_id, e
            );
            AppError::Database(format!("Failed to update balances: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    rfid: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    balance_main: i32,
    balance_bonus: Option<i32>,
    center_code: String,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            rfid: row.rfid,
            name: row.name,
            email: row.email,
            phone: row.phone,
            balance_main: row.balance_main,
            balance_bonus: row.balance_bonus,
            center_code: row.center_code,
        }
    }
}
