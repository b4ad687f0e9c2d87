//! Store bundle handed to the services at construction time

use kiosk_core::traits::{BillingLedger, CustomerStore, DeviceStore, GameStore, SetupStore};
use std::sync::Arc;

/// The five collaborators the pipeline consumes
#[derive(Clone)]
pub struct Stores {
    pub customers: Arc<dyn CustomerStore>,
    pub devices: Arc<dyn DeviceStore>,
    pub setups: Arc<dyn SetupStore>,
    pub games: Arc<dyn GameStore>,
    pub ledger: Arc<dyn BillingLedger>,
}

impl Stores {
    /// Use one backend for every collaborator
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: CustomerStore + DeviceStore + SetupStore + GameStore + BillingLedger + 'static,
    {
        Self {
            customers: backend.clone(),
            devices: backend.clone(),
            setups: backend.clone(),
            games: backend.clone(),
            ledger: backend,
        }
    }
}
