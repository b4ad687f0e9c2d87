//! Billing ledger implementation
//!
//! Records are inserted as `pending` and moved to `committed` or `void`
//! exactly once. No other column is ever updated by this service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiosk_core::{
    models::{BillingRecord, LedgerStatus},
    traits::BillingLedger,
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of BillingLedger
pub struct PgBillingLedger {
    pool: PgPool,
}

impl PgBillingLedger {
    /// Create a new billing ledger
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Move a pending record to a terminal status
    async fn transition(&self, guid: Uuid, to: LedgerStatus) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE es_billing
            SET ledger_status = $2,
                updated_at = NOW()
            WHERE guid = $1
              AND ledger_status = 'pending'
            "#,
        )
        .bind(guid)
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error marking billing {} as {}: {}", guid, to, e);
            AppError::Database(format!("Failed to update billing status: {}", e))
        })?;

        if result.rows_affected() == 0 {
            warn!("Billing {} was not pending, cannot mark {}", guid, to);
        }

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BillingLedger for PgBillingLedger {
    #[instrument(skip(self, record), fields(guid = %record.guid))]
    async fn append(&self, record: &BillingRecord) -> AppResult<bool> {
        debug!(
            "Appending billing for customer {}: amount={}",
            record.customer_id, record.amount
        );

        let result = sqlx::query(
            r#"
            INSERT INTO es_billing (
                guid, rfid, setup_id, customer_id, pre_amount, amount, post_amount,
                created_at, created_at_unix, log_device_ip, log_game, name, email, phone,
                is_deleted, customer_main_amount_used, customer_bonus_amount_used,
                center_code, ledger_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19)
            "#,
        )
        .bind(record.guid)
        .bind(&record.rfid)
        .bind(record.setup_id)
        .bind(record.customer_id)
        .bind(record.pre_amount)
        .bind(record.amount)
        .bind(record.post_amount)
        .bind(record.created_at)
        .bind(record.created_at_unix())
        .bind(&record.log_device_ip)
        .bind(&record.log_game)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(if record.is_deleted { "YES" } else { "NO" })
        .bind(record.customer_main_amount_used)
        .bind(record.customer_bonus_amount_used)
        .bind(&record.center_code)
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error appending billing {}: {}", record.guid, e);
            AppError::Database(format!("Failed to append billing: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn confirm(&self, guid: Uuid) -> AppResult<bool> {
        self.transition(guid, LedgerStatus::Committed).await
    }

    #[instrument(skip(self))]
    async fn void(&self, guid: Uuid) -> AppResult<bool> {
        self.transition(guid, LedgerStatus::Void).await
    }

    #[instrument(skip(self))]
    async fn status(&self, guid: Uuid) -> AppResult<Option<LedgerStatus>> {
        let status = sqlx::query_scalar::<sqlx::Postgres, String>(
            "SELECT ledger_status FROM es_billing WHERE guid = $1",
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error reading status of billing {}: {}", guid, e);
            AppError::Database(format!("Failed to read billing status: {}", e))
        })?;

        Ok(status.and_then(|s| LedgerStatus::from_str(&s)))
    }

    #[instrument(skip(self))]
    async fn list_pending(&self, older_than: DateTime<Utc>) -> AppResult<Vec<BillingRecord>> {
        let rows = sqlx::query_as::<sqlx::Postgres, BillingRow>(
            r#"
            SELECT
                guid, rfid, setup_id, customer_id, pre_amount, amount, post_amount,
                created_at, log_device_ip, log_game, name, email, phone, is_deleted,
                customer_main_amount_used, customer_bonus_amount_used,
                center_code, ledger_status
            FROM es_billing
            WHERE ledger_status = 'pending'
              AND created_at < $1
            ORDER BY created_at
            "#,
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing pending billing: {}", e);
            AppError::Database(format!("Failed to list pending billing: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BillingRow {
    guid: Uuid,
    rfid: String,
    setup_id: i32,
    customer_id: i32,
    pre_amount: i64,
    amount: i32,
    post_amount: i64,
    created_at: DateTime<Utc>,
    log_device_ip: String,
    log_game: String,
    name: String,
    email: String,
    phone: String,
    is_deleted: String,
    customer_main_amount_used: i32,
    customer_bonus_amount_used: i32,
    center_code: String,
    ledger_status: String,
}

impl From<BillingRow> for BillingRecord {
    fn from(row: BillingRow) -> Self {
        Self {
            guid: row.guid,
            rfid: row.rfid,
            setup_id: row.setup_id,
            customer_id: row.customer_id,
            pre_amount: row.pre_amount,
            amount: row.amount,
            post_amount: row.post_amount,
            created_at: row.created_at,
            log_device_ip: row.log_device_ip,
            log_game: row.log_game,
            name: row.name,
            email: row.email,
            phone: row.phone,
            is_deleted: row.is_deleted.eq_ignore_ascii_case("YES"),
            customer_main_amount_used: row.customer_main_amount_used,
            customer_bonus_amount_used: row.customer_bonus_amount_used,
            center_code: row.center_code,
            status: LedgerStatus::from_str(&row.ledger_status).unwrap_or_default(),
        }
    }
}
