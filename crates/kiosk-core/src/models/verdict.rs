//! Validation verdict
//!
//! Transient value threading lookup outputs into the debit stage. Never persisted.

use serde::Serialize;

/// Outcome of checking a customer against a device price point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub has_sufficient_balance: bool,

    /// Main plus bonus before any debit
    pub current_balance: i64,

    /// Price of one play on the device
    pub device_amount: i32,

    pub customer_id: i32,
    pub customer_name: String,
    pub setup_id: i32,
    pub game_name: String,
    pub rfid: String,
}

impl ValidationResult {
    /// Total balance once the play has been paid for
    #[inline]
    pub fn post_balance(&self) -> i64 {
        self.current_balance - i64::from(self.device_amount)
    }
}
