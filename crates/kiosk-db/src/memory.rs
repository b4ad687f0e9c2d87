//! In-memory store
//!
//! Implements every store trait over process-local maps. Used by the test
//! suites of the service and UDP crates; supports injected faults and an
//! artificial read latency to widen race windows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiosk_core::{
    models::{BillingRecord, Customer, Device, Game, LedgerStatus, Setup},
    traits::{BillingLedger, CustomerStore, DeviceStore, GameStore, SetupStore},
    AppError, AppResult,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Faults the store will raise on the next matching calls
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Any read or write fails with a database error
    pub unavailable: bool,
    pub fail_balance_update: bool,
    /// Balance update succeeds at the driver level but touches no row
    pub balance_update_no_row: bool,
    pub fail_append: bool,
    pub fail_confirm: bool,
    /// Confirm is applied but the call still reports an error
    pub confirm_ack_lost: bool,
    pub fail_status: bool,
    pub fail_void: bool,
    /// Fail every balance update after the first one (breaks compensation)
    pub fail_balance_update_after_first: bool,
}

#[derive(Default)]
struct Tables {
    customers: HashMap<i32, Customer>,
    devices: Vec<Device>,
    setups: HashMap<i32, Setup>,
    games: HashMap<i32, Game>,
    billing: Vec<BillingRecord>,
}

/// Store implementing all five collaborator traits
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    faults: Mutex<Faults>,
    read_latency: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    mutations: AtomicUsize,
    balance_updates: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(self, customer: Customer) -> Self {
        self.tables.write().customers.insert(customer.id, customer);
        self
    }

    pub fn with_device(self, device: Device) -> Self {
        self.tables.write().devices.push(device);
        self
    }

    pub fn with_setup(self, setup: Setup) -> Self {
        self.tables.write().setups.insert(setup.id, setup);
        self
    }

    pub fn with_game(self, game: Game) -> Self {
        self.tables.write().games.insert(game.id, game);
        self
    }

    /// Delay applied to customer reads
    pub fn with_read_latency(self, latency: Duration) -> Self {
        *self.read_latency.lock() = Some(latency);
        self
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock() = faults;
    }

    pub fn customer(&self, id: i32) -> Option<Customer> {
        self.tables.read().customers.get(&id).cloned()
    }

    /// Every record ever appended, in append order
    pub fn billing_records(&self) -> Vec<BillingRecord> {
        self.tables.read().billing.clone()
    }

    pub fn committed_records(&self) -> Vec<BillingRecord> {
        self.tables
            .read()
            .billing
            .iter()
            .filter(|r| r.status == LedgerStatus::Committed)
            .cloned()
            .collect()
    }

    /// Number of store calls of any kind
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of successful writes (balance updates, appends, transitions)
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn enter(&self) -> AppResult<Faults> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let faults = self.faults.lock().clone();
        if faults.unavailable {
            return Err(AppError::Database("store unavailable".to_string()));
        }
        Ok(faults)
    }

    fn transition(&self, guid: Uuid, to: LedgerStatus) -> bool {
        let mut tables = self.tables.write();
        match tables
            .billing
            .iter_mut()
            .find(|r| r.guid == guid && r.status.is_open())
        {
            Some(record) => {
                record.status = to;
                self.mutations.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn get_by_rfid(&self, rfid: &str) -> AppResult<Option<Customer>> {
        self.enter()?;
        let latency = *self.read_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self
            .tables
            .read()
            .customers
            .values()
            .find(|c| c.rfid == rfid)
            .cloned())
    }

    async fn update_balances(
        &self,
        customer_id: i32,
        new_main: i32,
        new_bonus: i32,
    ) -> AppResult<bool> {
        let faults = self.enter()?;
        let previous_updates = self.balance_updates.fetch_add(1, Ordering::SeqCst);
        if faults.fail_balance_update
            || (faults.fail_balance_update_after_first && previous_updates > 0)
        {
            return Err(AppError::Database("balance update failed".to_string()));
        }
        if faults.balance_update_no_row {
            return Ok(false);
        }

        let mut tables = self.tables.write();
        match tables.customers.get_mut(&customer_id) {
            Some(customer) => {
                customer.balance_main = new_main;
                customer.balance_bonus = Some(new_bonus);
                self.mutations.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl DeviceStore for InMemoryStore {
    async fn get_by_mac(&self, mac: &str) -> AppResult<Option<Device>> {
        self.enter()?;
        Ok(self
            .tables
            .read()
            .devices
            .iter()
            .find(|d| d.device_mac == mac && d.is_active())
            .cloned())
    }
}

#[async_trait]
impl SetupStore for InMemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Setup>> {
        self.enter()?;
        Ok(self.tables.read().setups.get(&id).cloned())
    }
}

#[async_trait]
impl GameStore for InMemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Game>> {
        self.enter()?;
        Ok(self.tables.read().games.get(&id).cloned())
    }
}

#[async_trait]
impl BillingLedger for InMemoryStore {
    async fn append(&self, record: &BillingRecord) -> AppResult<bool> {
        let faults = self.enter()?;
        if faults.fail_append {
            return Err(AppError::Database("billing append failed".to_string()));
        }

        let mut tables = self.tables.write();
        if tables.billing.iter().any(|r| r.guid == record.guid) {
            return Ok(false);
        }
        tables.billing.push(record.clone());
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn confirm(&self, guid: Uuid) -> AppResult<bool> {
        let faults = self.enter()?;
        if faults.fail_confirm {
            return Err(AppError::Database("billing confirm failed".to_string()));
        }
        let confirmed = self.transition(guid, LedgerStatus::Committed);
        if faults.confirm_ack_lost {
            return Err(AppError::Database("connection reset after confirm".to_string()));
        }
        Ok(confirmed)
    }

    async fn void(&self, guid: Uuid) -> AppResult<bool> {
        let faults = self.enter()?;
        if faults.fail_void {
            return Err(AppError::Database("billing void failed".to_string()));
        }
        Ok(self.transition(guid, LedgerStatus::Void))
    }

    async fn status(&self, guid: Uuid) -> AppResult<Option<LedgerStatus>> {
        let faults = self.enter()?;
        if faults.fail_status {
            return Err(AppError::Database("billing status read failed".to_string()));
        }
        Ok(self
            .tables
            .read()
            .billing
            .iter()
            .find(|r| r.guid == guid)
            .map(|r| r.status))
    }

    async fn list_pending(&self, older_than: DateTime<Utc>) -> AppResult<Vec<BillingRecord>> {
        self.enter()?;
        Ok(self
            .tables
            .read()
            .billing
            .iter()
            .filter(|r| r.status.is_open() && r.created_at < older_than)
            .cloned()
            .collect())
    }
}
