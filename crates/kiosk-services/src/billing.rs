//! Billing recorder
//!
//! Builds the ledger record for one debit and drives it through the
//! ledger lifecycle (`pending` → `committed` | `void`).

use chrono::Utc;
use kiosk_core::{
    models::{BillingRecord, Customer, LedgerStatus, ValidationResult},
    traits::BillingLedger,
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::debit::DebitPlan;

/// Request-scoped facts the ledger needs besides the verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitContext {
    /// IP of the device that sent the datagram
    pub device_ip: String,
    /// Tenant tag of the device
    pub center_code: String,
}

/// Billing recorder
pub struct BillingRecorder {
    ledger: Arc<dyn BillingLedger>,
}

impl BillingRecorder {
    pub fn new(ledger: Arc<dyn BillingLedger>) -> Self {
        Self { ledger }
    }

    /// Build a pending record for a planned debit
    pub fn build_record(
        verdict: &ValidationResult,
        customer: &Customer,
        plan: &DebitPlan,
        context: &DebitContext,
    ) -> BillingRecord {
        BillingRecord {
            guid: Uuid::new_v4(),
            rfid: verdict.rfid.clone(),
            setup_id: verdict.setup_id,
            customer_id: verdict.customer_id,
            pre_amount: verdict.current_balance,
            amount: verdict.device_amount,
            post_amount: verdict.post_balance(),
            customer_main_amount_used: plan.from_main,
            customer_bonus_amount_used: plan.from_bonus,
            created_at: Utc::now(),
            log_device_ip: context.device_ip.clone(),
            log_game: verdict.game_name.clone(),
            name: verdict.customer_name.clone(),
            email: customer.email.clone().unwrap_or_default(),
            phone: customer.phone.clone().unwrap_or_default(),
            is_deleted: false,
            center_code: context.center_code.clone(),
            status: LedgerStatus::Pending,
        }
    }

    /// Append a record; a store that does not accept it is a persistence failure
    #[instrument(skip(self, record), fields(guid = %record.guid))]
    pub async fn append(&self, record: &BillingRecord) -> AppResult<()> {
        if !self.ledger.append(record).await? {
            error!("Billing ledger did not accept record {}", record.guid);
            return Err(AppError::Persistence(format!(
                "billing record {} not accepted",
                record.guid
            )));
        }
        debug!("Billing record {} appended as pending", record.guid);
        Ok(())
    }

    /// Mark a record committed
    pub async fn confirm(&self, guid: Uuid) -> AppResult<()> {
        if !self.ledger.confirm(guid).await? {
            return Err(AppError::Persistence(format!(
                "billing record {} could not be confirmed",
                guid
            )));
        }
        Ok(())
    }

    /// Current status of a record as the ledger sees it
    pub async fn status(&self, guid: Uuid) -> AppResult<Option<LedgerStatus>> {
        self.ledger.status(guid).await
    }

    /// Mark a record void
    pub async fn void(&self, guid: Uuid) -> AppResult<()> {
        if !self.ledger.void(guid).await? {
            return Err(AppError::Persistence(format!(
                "billing record {} could not be voided",
                guid
            )));
        }
        Ok(())
    }
}
