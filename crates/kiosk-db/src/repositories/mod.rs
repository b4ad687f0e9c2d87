//! Store implementations
//!
//! This module contains the PostgreSQL implementations of the store traits
//! defined in kiosk-core, using sqlx.

pub mod billing_repo;
pub mod customer_repo;
pub mod device_repo;
pub mod game_repo;

pub use billing_repo::PgBillingLedger;
pub use customer_repo::PgCustomerRepository;
pub use device_repo::PgDeviceRepository;
pub use game_repo::PgGameRepository;
