//! Billing ledger model
//!
//! One record per successful debit. A record is appended as `Pending`,
//! then either confirmed once the customer balances are updated, or voided
//! when the balance update could not be applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ledger record lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    /// Appended, balance update not yet confirmed
    #[default]
    Pending,
    /// Balance update applied
    Committed,
    /// Compensated; the debit never took effect
    Void,
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Committed => "committed",
            LedgerStatus::Void => "void",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LedgerStatus::Pending),
            "committed" => Some(LedgerStatus::Committed),
            "void" => Some(LedgerStatus::Void),
            _ => None,
        }
    }

    /// Only pending records may transition
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, LedgerStatus::Pending)
    }
}

/// Immutable ledger entry for one play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Transaction identifier, unique per debit
    pub guid: Uuid,

    pub rfid: String,
    pub setup_id: i32,
    pub customer_id: i32,

    /// Total balance before the play
    pub pre_amount: i64,

    /// Price of the play
    pub amount: i32,

    /// Total balance after the play
    pub post_amount: i64,

    pub customer_main_amount_used: i32,
    pub customer_bonus_amount_used: i32,

    pub created_at: DateTime<Utc>,

    /// IP address of the device that sent the request
    pub log_device_ip: String,

    /// Game label
    pub log_game: String,

    pub name: String,
    pub email: String,
    pub phone: String,

    pub is_deleted: bool,
    pub center_code: String,
    pub status: LedgerStatus,
}

impl BillingRecord {
    /// Unix timestamp of creation, as stored alongside `created_at`
    #[inline]
    pub fn created_at_unix(&self) -> i64 {
        self.created_at.timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_status_roundtrip_names() {
        for status in [LedgerStatus::Pending, LedgerStatus::Committed, LedgerStatus::Void] {
            assert_eq!(LedgerStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LedgerStatus::from_str("refunded"), None);
    }

    #[test]
    fn test_only_pending_is_open() {
        assert!(LedgerStatus::Pending.is_open());
        assert!(!LedgerStatus::Committed.is_open());
        assert!(!LedgerStatus::Void.is_open());
    }
}
