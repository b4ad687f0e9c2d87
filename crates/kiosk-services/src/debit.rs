//! Debit engine
//!
//! Splits the price of one play across the two credit pools and applies
//! the result:
//! - main pays alone when it covers the price
//! - otherwise main is drained down to the -1 floor and bonus pays the rest
//! - a plan that would push bonus below zero is rejected
//!
//! Applying a plan is two writes (ledger append, balance update) that do
//! not share a transaction. The record is appended as `pending` and only
//! confirmed after the balances moved; failures are compensated by voiding
//! the record or restoring the balances. A failed confirm is only
//! compensated when the ledger still shows the record as pending.

use kiosk_core::{
    models::{Customer, LedgerStatus, ValidationResult, MAIN_BALANCE_FLOOR},
    traits::{BillingLedger, CustomerStore},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::billing::{BillingRecorder, DebitContext};

/// How one price is split across main and bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebitPlan {
    /// Taken from main; negative when bonus covered a pre-existing main deficit
    pub from_main: i32,
    pub from_bonus: i32,
    pub new_main: i32,
    pub new_bonus: i32,
}

impl DebitPlan {
    /// Compute the split for `amount` against the given balances
    ///
    /// # Errors
    ///
    /// - `BalanceFloorViolation` when the split would leave bonus negative
    /// - `Validation` for a negative amount
    pub fn compute(main: i32, bonus: i32, amount: i32) -> AppResult<Self> {
        if amount < 0 {
            return Err(AppError::Validation(format!(
                "debit amount must not be negative: {}",
                amount
            )));
        }

        let floor = i64::from(MAIN_BALANCE_FLOOR);
        let (main, bonus, amount) = (i64::from(main), i64::from(bonus), i64::from(amount));

        let (mut from_main, mut from_bonus) = if main >= amount {
            (amount, 0)
        } else {
            let from_main = (main - floor).clamp(0, amount);
            (from_main, amount - from_main)
        };

        let mut new_main = main - from_main;

        // Main already below the floor: bonus pays the shortfall too
        if new_main < floor {
            let shortfall = floor - new_main;
            new_main = floor;
            from_main -= shortfall;
            from_bonus += shortfall;
        }
        let new_bonus = bonus - from_bonus;

        if new_bonus < 0 {
            return Err(AppError::BalanceFloorViolation {
                main,
                bonus,
                amount,
                new_bonus,
            });
        }

        let narrow = |value: i64| {
            i32::try_from(value)
                .map_err(|_| AppError::Internal(format!("debit value {} out of range", value)))
        };

        Ok(Self {
            from_main: narrow(from_main)?,
            from_bonus: narrow(from_bonus)?,
            new_main: narrow(new_main)?,
            new_bonus: narrow(new_bonus)?,
        })
    }
}

/// Result of an applied debit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitReceipt {
    /// Billing record guid
    pub guid: Uuid,
    pub plan: DebitPlan,
    /// Total balance after the debit
    pub post_balance: i64,
}

/// Debit engine
///
/// Must be called with the customer's lock held; the balance snapshot in
/// `customer` is what gets restored on compensation.
pub struct DebitEngine {
    customers: Arc<dyn CustomerStore>,
    recorder: BillingRecorder,
}

impl DebitEngine {
    /// Create a new debit engine
    pub fn new(customers: Arc<dyn CustomerStore>, ledger: Arc<dyn BillingLedger>) -> Self {
        Self {
            customers,
            recorder: BillingRecorder::new(ledger),
        }
    }

    /// Debit one play from the customer and record it
    ///
    /// # Errors
    ///
    /// - `BalanceFloorViolation` when the plan is rejected; nothing was written
    /// - any persistence error from the ledger or the balance update, after
    ///   compensation has been attempted
    #[instrument(
        skip(self, verdict, customer, context),
        fields(customer_id = customer.id, amount = verdict.device_amount)
    )]
    pub async fn execute(
        &self,
        verdict: &ValidationResult,
        customer: &Customer,
        context: &DebitContext,
    ) -> AppResult<DebitReceipt> {
        if !verdict.has_sufficient_balance {
            return Err(AppError::Internal(format!(
                "debit requested for customer {} without sufficient balance",
                customer.id
            )));
        }

        let plan = DebitPlan::compute(customer.balance_main, customer.bonus(), verdict.device_amount)?;
        debug!(
            "Debit plan for customer {}: main {} -> {}, bonus {} -> {}",
            customer.id,
            customer.balance_main,
            plan.new_main,
            customer.bonus(),
            plan.new_bonus
        );

        let record = BillingRecorder::build_record(verdict, customer, &plan, context);
        let guid = record.guid;
        self.recorder.append(&record).await?;

        match self
            .customers
            .update_balances(customer.id, plan.new_main, plan.new_bonus)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                error!("Balance update for customer {} touched no row", customer.id);
                self.void_or_report(guid).await;
                return Err(AppError::Persistence(format!(
                    "customer {} balance update affected no row",
                    customer.id
                )));
            }
            Err(e) => {
                error!("Balance update for customer {} failed: {}", customer.id, e);
                self.void_or_report(guid).await;
                return Err(e);
            }
        }

        if let Err(e) = self.recorder.confirm(guid).await {
            error!("Failed to confirm billing record {}: {}", guid, e);
            match self.recorder.status(guid).await {
                // The confirm reached the ledger; only its acknowledgement was lost
                Ok(Some(LedgerStatus::Committed)) => {
                    warn!("Billing record {} is committed despite the confirm error", guid);
                }
                Ok(Some(LedgerStatus::Pending)) => {
                    self.restore_balances(customer, guid).await;
                    return Err(e);
                }
                Ok(status) => {
                    error!(
                        "Billing record {} is {:?} after confirm error; customer {} left debited",
                        guid, status, customer.id
                    );
                    return Err(e);
                }
                Err(status_err) => {
                    error!(
                        "Could not read billing record {}: {}; customer {} left debited",
                        guid, status_err, customer.id
                    );
                    return Err(e);
                }
            }
        }

        info!(
            "Debited {} from customer {} (main {}, bonus {}), billing {}",
            verdict.device_amount, customer.id, plan.from_main, plan.from_bonus, guid
        );

        Ok(DebitReceipt {
            guid,
            plan,
            post_balance: verdict.post_balance(),
        })
    }

    /// Put the pre-debit balances back, then void the record
    async fn restore_balances(&self, customer: &Customer, guid: Uuid) {
        match self
            .customers
            .update_balances(customer.id, customer.balance_main, customer.bonus())
            .await
        {
            Ok(true) => {
                warn!("Restored balances of customer {} after failed confirm", customer.id);
                self.void_or_report(guid).await;
            }
            Ok(false) => error!(
                "Could not restore balances of customer {}: no row; billing {} left pending",
                customer.id, guid
            ),
            Err(e) => error!(
                "Could not restore balances of customer {}: {}; billing {} left pending",
                customer.id, e, guid
            ),
        }
    }

    async fn void_or_report(&self, guid: Uuid) {
        match self.recorder.void(guid).await {
            Ok(()) => warn!("Billing record {} voided", guid),
            Err(e) => error!(
                "Could not void billing record {}: {}; sweeper reports it while pending",
                guid, e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_main_covers_price() {
        let plan = DebitPlan::compute(10, 5, 4).unwrap();
        assert_eq!(plan.from_main, 4);
        assert_eq!(plan.from_bonus, 0);
        assert_eq!(plan.new_main, 6);
        assert_eq!(plan.new_bonus, 5);
    }

    #[test]
    fn test_main_drains_to_floor_then_bonus() {
        let plan = DebitPlan::compute(3, 10, 6).unwrap();
        assert_eq!(plan.from_main, 4);
        assert_eq!(plan.from_bonus, 2);
        assert_eq!(plan.new_main, -1);
        assert_eq!(plan.new_bonus, 8);
    }

    #[test]
    fn test_main_at_floor_pays_nothing() {
        let plan = DebitPlan::compute(-1, 10, 4).unwrap();
        assert_eq!(plan.from_main, 0);
        assert_eq!(plan.new_main, -1);
        assert_eq!(plan.new_bonus, 6);
    }

    #[test]
    fn test_main_below_floor_is_lifted_by_bonus() {
        let plan = DebitPlan::compute(-5, 20, 4).unwrap();
        assert_eq!(plan.new_main, -1);
        assert_eq!(plan.new_bonus, 12);
        assert_eq!(plan.from_main, -4);
        assert_eq!(plan.from_bonus, 8);
    }

    #[test]
    fn test_negative_bonus_is_rejected() {
        let err = DebitPlan::compute(5, 10, 20).unwrap_err();
        assert!(matches!(
            err,
            AppError::BalanceFloorViolation {
                main: 5,
                bonus: 10,
                amount: 20,
                new_bonus: -4,
            }
        ));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        assert!(matches!(
            DebitPlan::compute(5, 0, -1),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_extreme_balances_do_not_overflow() {
        let plan = DebitPlan::compute(i32::MAX, i32::MAX, i32::MAX).unwrap();
        assert_eq!(plan.new_main, 0);
        assert_eq!(plan.new_bonus, i32::MAX);
    }

    proptest! {
        #[test]
        fn split_debit_preserves_total_and_floors(
            main in -50i32..10_000,
            bonus in 0i32..10_000,
            amount in 0i32..10_000,
        ) {
            prop_assume!(i64::from(main) + i64::from(bonus) >= i64::from(amount));

            let plan = DebitPlan::compute(main, bonus, amount).unwrap();

            prop_assert!(plan.new_main >= MAIN_BALANCE_FLOOR);
            prop_assert!(plan.new_bonus >= 0);
            prop_assert_eq!(
                i64::from(plan.new_main) + i64::from(plan.new_bonus),
                i64::from(main) + i64::from(bonus) - i64::from(amount)
            );
            prop_assert_eq!(plan.from_main + plan.from_bonus, amount);
        }

        #[test]
        fn plan_never_breaks_floors(
            main in -50i32..10_000,
            bonus in -50i32..10_000,
            amount in 0i32..10_000,
        ) {
            if let Ok(plan) = DebitPlan::compute(main, bonus, amount) {
                prop_assert!(plan.new_main >= MAIN_BALANCE_FLOOR);
                prop_assert!(plan.new_bonus >= 0);
            }
        }
    }
}
