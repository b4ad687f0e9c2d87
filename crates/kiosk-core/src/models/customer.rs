//! Customer model
//!
//! Customers carry two independent credit pools. Debits drain the main
//! balance down to a floor of -1 before drawing on the bonus balance.

use serde::{Deserialize, Serialize};

/// Lowest value the main balance may reach after a debit
pub const MAIN_BALANCE_FLOOR: i32 = -1;

/// Customer entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier
    pub id: i32,

    /// RFID token as presented by devices, braces included
    pub rfid: String,

    /// Display name
    pub name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    /// Main balance; may sit at the -1 floor
    pub balance_main: i32,

    /// Bonus balance; absent is treated as zero
    pub balance_bonus: Option<i32>,

    /// Opaque tenant tag
    pub center_code: String,
}

impl Customer {
    /// Bonus balance with the absent case folded to zero
    #[inline]
    pub fn bonus(&self) -> i32 {
        self.balance_bonus.unwrap_or(0)
    }

    /// Main plus bonus, widened so the sum cannot overflow
    #[inline]
    pub fn total_balance(&self) -> i64 {
        i64::from(self.balance_main) + i64::from(self.bonus())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(main: i32, bonus: Option<i32>) -> Customer {
        Customer {
            id: 1,
            rfid: "{A1B2C3}".to_string(),
            name: "Test".to_string(),
            email: None,
            phone: None,
            balance_main: main,
            balance_bonus: bonus,
            center_code: "CENTER_1".to_string(),
        }
    }

    #[test]
    fn test_total_balance() {
        assert_eq!(customer(5, Some(10)).total_balance(), 15);
        assert_eq!(customer(-1, Some(3)).total_balance(), 2);
    }

    #[test]
    fn test_missing_bonus_is_zero() {
        let c = customer(7, None);
        assert_eq!(c.bonus(), 0);
        assert_eq!(c.total_balance(), 7);
    }

    #[test]
    fn test_total_balance_does_not_overflow() {
        let c = customer(i32::MAX, Some(i32::MAX));
        assert_eq!(c.total_balance(), 2 * i64::from(i32::MAX));
    }
}
