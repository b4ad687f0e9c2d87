//! Balance validator
//!
//! Pure sufficiency check of a customer against a device price point.

use kiosk_core::models::{Customer, ValidationResult};

use crate::lookup::PricePoint;

/// Computes validation verdicts
pub struct BalanceValidator;

impl BalanceValidator {
    /// Evaluate whether the customer can pay for one play.
    ///
    /// The total is main plus bonus (absent bonus counts as zero) and is
    /// sufficient when it covers the price exactly or better.
    pub fn evaluate(customer: &Customer, price: &PricePoint, rfid: &str) -> ValidationResult {
        let current_balance = customer.total_balance();
        let device_amount = price.setup.amount;

        ValidationResult {
            is_valid: true,
            has_sufficient_balance: current_balance >= i64::from(device_amount),
            current_balance,
            device_amount,
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            setup_id: price.setup.id,
            game_name: price.game.game_name.clone(),
            rfid: rfid.to_string(),
        }
    }
}
