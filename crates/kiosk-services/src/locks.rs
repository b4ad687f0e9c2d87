//! Per-customer serialization
//!
//! Every authorization for an RFID runs while holding that RFID's async
//! mutex, so two concurrent taps never both debit from the same snapshot.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::constants::LOCK_PRUNE_THRESHOLD;

/// Table of async mutexes keyed by RFID
#[derive(Default)]
pub struct CustomerLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CustomerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one customer
    pub async fn acquire(&self, rfid: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.inner.lock();
            if table.len() >= LOCK_PRUNE_THRESHOLD {
                // An entry only the table references is idle
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
                debug!("Pruned customer lock table to {} entries", table.len());
            }
            table.entry(rfid.to_string()).or_default().clone()
        };

        lock.lock_owned().await
    }

    /// Number of tracked RFIDs
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
