//! Store traits consumed by the authorization pipeline
//!
//! The pipeline depends only on these capabilities; how the data is
//! persisted is up to the implementation.

use crate::error::AppError;
use crate::models::{BillingRecord, Customer, Device, Game, LedgerStatus, Setup};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Customer lookups and balance mutation
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Find customer by RFID token (braces included)
    async fn get_by_rfid(&self, rfid: &str) -> Result<Option<Customer>, AppError>;

    /// Overwrite both balances in a single update.
    ///
    /// Returns `false` when no customer row was updated.
    async fn update_balances(
        &self,
        customer_id: i32,
        new_main: i32,
        new_bonus: i32,
    ) -> Result<bool, AppError>;
}

/// Device lookups
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Find an ACTIVE device by MAC address
    async fn get_by_mac(&self, mac: &str) -> Result<Option<Device>, AppError>;
}

/// Setup (price point) lookups
#[async_trait]
pub trait SetupStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<Option<Setup>, AppError>;
}

/// Game lookups
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<Option<Game>, AppError>;
}

/// Append-only billing ledger
#[async_trait]
pub trait BillingLedger: Send + Sync {
    /// Append a record; returns `false` when the store did not accept it
    async fn append(&self, record: &BillingRecord) -> Result<bool, AppError>;

    /// Mark a pending record committed
    async fn confirm(&self, guid: Uuid) -> Result<bool, AppError>;

    /// Mark a pending record void
    async fn void(&self, guid: Uuid) -> Result<bool, AppError>;

    /// Current lifecycle status of a record, `None` when it does not exist
    async fn status(&self, guid: Uuid) -> Result<Option<LedgerStatus>, AppError>;

    /// Records still pending that were created before `older_than`
    async fn list_pending(&self, older_than: DateTime<Utc>)
        -> Result<Vec<BillingRecord>, AppError>;
}
