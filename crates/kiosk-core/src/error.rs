//! Unified error handling for the RFID kiosk service
//!
//! Every failure inside the authorization pipeline is expressed as an
//! `AppError`. The session loop never lets one escape: each variant is
//! classified into the reply the device receives.

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Wire Errors ====================
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    // ==================== Lookup Errors ====================
    #[error("Customer not found for RFID: {0}")]
    CustomerNotFound(String),

    #[error("Active device not found for MAC: {0}")]
    DeviceNotFound(String),

    #[error("Setup not found: {0}")]
    SetupNotFound(String),

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Invalid setup {setup_id}: {reason}")]
    InvalidSetup { setup_id: i32, reason: String },

    // ==================== Business Logic Errors ====================
    #[error("Debit rejected: main {main}, bonus {bonus}, amount {amount} would leave bonus at {new_bonus}")]
    BalanceFloorViolation {
        main: i64,
        bonus: i64,
        amount: i64,
        new_bonus: i64,
    },

    // ==================== Persistence Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    // ==================== Transport Errors ====================
    #[error("Transport error: {0}")]
    Transport(String),

    // ==================== Internal Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code used in structured logs
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MalformedMessage(_) => "malformed_message",
            AppError::CustomerNotFound(_) => "customer_not_found",
            AppError::DeviceNotFound(_) => "device_not_found",
            AppError::SetupNotFound(_) => "setup_not_found",
            AppError::GameNotFound(_) => "game_not_found",
            AppError::InvalidSetup { .. } => "invalid_setup",
            AppError::BalanceFloorViolation { .. } => "balance_floor_violation",
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Persistence(_) => "persistence_failure",
            AppError::Transport(_) => "transport_error",
            AppError::Validation(_) => "validation_error",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// A required record (customer, device, setup, game) could not be resolved
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            AppError::CustomerNotFound(_)
                | AppError::DeviceNotFound(_)
                | AppError::SetupNotFound(_)
                | AppError::GameNotFound(_)
                | AppError::InvalidSetup { .. }
        )
    }

    /// A store call failed; money state may need reconciliation
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Pool(_)
                | AppError::Persistence(_)
        )
    }
}

// ==================== From implementations ====================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::MalformedMessage("garbage".to_string()).error_code(),
            "malformed_message"
        );
        assert_eq!(
            AppError::BalanceFloorViolation {
                main: 5,
                bonus: 10,
                amount: 20,
                new_bonus: -4
            }
            .error_code(),
            "balance_floor_violation"
        );
    }

    #[test]
    fn test_lookup_miss_classification() {
        assert!(AppError::CustomerNotFound("{A1}".to_string()).is_lookup_miss());
        assert!(AppError::GameNotFound("7".to_string()).is_lookup_miss());
        assert!(!AppError::Database("down".to_string()).is_lookup_miss());
        assert!(!AppError::MalformedMessage("x".to_string()).is_lookup_miss());
    }

    #[test]
    fn test_persistence_classification() {
        assert!(AppError::Persistence("no row".to_string()).is_persistence_failure());
        assert!(AppError::Pool("timeout".to_string()).is_persistence_failure());
        assert!(!AppError::SetupNotFound("3".to_string()).is_persistence_failure());
    }

    #[test]
    fn test_io_error_is_transport() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy").into();
        assert_eq!(err.error_code(), "transport_error");
    }
}
