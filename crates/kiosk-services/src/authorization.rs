//! RFID authorization service
//!
//! Runs one tap end to end: customer lookup, device price resolution,
//! sufficiency check and debit. The whole sequence for an RFID runs under
//! that RFID's lock.

use kiosk_core::{
    models::{Customer, ValidationResult},
    AppError, AppResult,
};
use std::net::IpAddr;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::billing::DebitContext;
use crate::debit::DebitEngine;
use crate::locks::CustomerLocks;
use crate::lookup::{DeviceLookup, PricePoint};
use crate::stores::Stores;
use crate::validator::BalanceValidator;

/// What the device is told
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// Play authorized and paid for
    Granted { post_balance: i64, guid: Uuid },
    /// Play refused; balance left untouched
    Denied { current_balance: i64 },
}

/// Lookup and validation output for one tap
#[derive(Debug, Clone)]
pub struct Validated {
    pub verdict: ValidationResult,
    pub customer: Customer,
    pub price: PricePoint,
}

/// RFID authorization service
pub struct RfidAuthorizationService {
    stores: Stores,
    lookup: DeviceLookup,
    debit: DebitEngine,
    locks: CustomerLocks,
}

impl RfidAuthorizationService {
    /// Create a new authorization service
    pub fn new(stores: Stores) -> Self {
        let lookup = DeviceLookup::new(
            stores.devices.clone(),
            stores.setups.clone(),
            stores.games.clone(),
        );
        let debit = DebitEngine::new(stores.customers.clone(), stores.ledger.clone());

        Self {
            stores,
            lookup,
            debit,
            locks: CustomerLocks::new(),
        }
    }

    /// Resolve customer and device and compute the verdict
    ///
    /// Performs no writes. Callers that go on to debit must hold the
    /// customer's lock across this call.
    pub async fn validate(&self, rfid: &str, mac: &str) -> AppResult<Validated> {
        let customer = self
            .stores
            .customers
            .get_by_rfid(rfid)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(rfid.to_string()))?;

        let price = self.lookup.resolve(mac).await?;
        let verdict = BalanceValidator::evaluate(&customer, &price, rfid);

        Ok(Validated {
            verdict,
            customer,
            price,
        })
    }

    /// Authorize one play for the RFID on the device with the given MAC
    ///
    /// # Errors
    ///
    /// Lookup misses and persistence failures; insufficient balance is a
    /// `Denied` outcome, not an error.
    #[instrument(skip(self))]
    pub async fn authorize(
        &self,
        rfid: &str,
        mac: &str,
        device_ip: IpAddr,
    ) -> AppResult<AuthorizationOutcome> {
        let _guard = self.locks.acquire(rfid).await;

        let Validated {
            verdict,
            customer,
            price,
        } = self.validate(rfid, mac).await?;

        if !verdict.has_sufficient_balance {
            warn!(
                "Insufficient balance for {}: required {}, available {}",
                rfid, verdict.device_amount, verdict.current_balance
            );
            return Ok(AuthorizationOutcome::Denied {
                current_balance: verdict.current_balance,
            });
        }

        let context = DebitContext {
            device_ip: device_ip.to_string(),
            center_code: price.device.center_code.clone(),
        };

        match self.debit.execute(&verdict, &customer, &context).await {
            Ok(receipt) => {
                info!(
                    "Authorized {} on {} ({}): balance {} -> {}",
                    rfid, mac, verdict.game_name, verdict.current_balance, receipt.post_balance
                );
                Ok(AuthorizationOutcome::Granted {
                    post_balance: receipt.post_balance,
                    guid: receipt.guid,
                })
            }
            Err(e @ AppError::BalanceFloorViolation { .. }) => {
                warn!("Debit for {} refused: {}", rfid, e);
                Ok(AuthorizationOutcome::Denied {
                    current_balance: verdict.current_balance,
                })
            }
            Err(e) => Err(e),
        }
    }
}
