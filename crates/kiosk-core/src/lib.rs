//! Kiosk RFID Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the RFID balance-authorization service. It includes:
//!
//! - Domain models (Customer, Device, Setup, Game, BillingRecord)
//! - Store traits consumed by the authorization pipeline
//! - Unified error handling with device-reply classification
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
