//! Kiosk RFID Store Layer
//!
//! This crate provides the store implementations consumed by the
//! authorization pipeline. It includes:
//!
//! - Connection pool management with sqlx
//! - PostgreSQL adapters for customers, devices, setups, games and billing
//! - Bundled schema migrations
//! - An in-memory store for tests and local runs

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::InMemoryStore;
pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use kiosk_core::{AppError, AppResult};
pub use sqlx::PgPool;
