//! Business logic services for the RFID kiosk
//!
//! This crate contains the authorization pipeline that turns a tap on an
//! arcade device into either a debit or a denial.
//!
//! # Architecture
//!
//! - Each service owns its dependencies (stores passed in as `Arc<dyn _>`)
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All money mutations for one RFID run under that RFID's lock
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `DeviceLookup` - MAC → device → setup → game resolution
//! - `BalanceValidator` - sufficiency verdict over main + bonus
//! - `DebitEngine` - split debit with the -1 main floor and ledger compensation
//! - `BillingRecorder` - billing record construction and ledger transitions
//! - `RfidAuthorizationService` - the full per-request pipeline
//! - `PendingSweeper` - reports ledger records stuck in `pending`

pub mod authorization;
pub mod billing;
pub mod debit;
pub mod locks;
pub mod lookup;
pub mod stores;
pub mod sweeper;
pub mod validator;

pub use authorization::{AuthorizationOutcome, RfidAuthorizationService, Validated};
pub use billing::{BillingRecorder, DebitContext};
pub use debit::{DebitEngine, DebitPlan, DebitReceipt};
pub use locks::CustomerLocks;
pub use lookup::{DeviceLookup, PricePoint};
pub use stores::Stores;
pub use sweeper::PendingSweeper;
pub use validator::BalanceValidator;

/// Business logic constants
pub mod constants {
    /// Lock table size above which idle per-customer locks are pruned
    pub const LOCK_PRUNE_THRESHOLD: usize = 1024;
}
