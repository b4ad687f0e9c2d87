//! Domain models for the RFID kiosk service
//!
//! This module contains the core domain models used by the authorization pipeline.

pub mod billing;
pub mod customer;
pub mod device;
pub mod verdict;

pub use billing::{BillingRecord, LedgerStatus};
pub use customer::{Customer, MAIN_BALANCE_FLOOR};
pub use device::{Device, DeviceStatus, Game, Setup};
pub use verdict::ValidationResult;
