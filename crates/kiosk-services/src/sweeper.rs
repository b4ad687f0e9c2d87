//! Pending billing sweeper
//!
//! Records left `pending` past the grace period mean a compensation step
//! failed and the customer balance may disagree with the ledger. The
//! sweeper reports them; reconciliation is done out of band.

use chrono::Utc;
use kiosk_core::{config::LedgerConfig, traits::BillingLedger, AppResult};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Periodic reporter of orphaned pending records
pub struct PendingSweeper {
    ledger: Arc<dyn BillingLedger>,
    grace: Duration,
    interval: Duration,
}

impl PendingSweeper {
    pub fn new(ledger: Arc<dyn BillingLedger>, grace: Duration, interval: Duration) -> Self {
        Self {
            ledger,
            grace,
            interval,
        }
    }

    /// Build from ledger settings; `None` when sweeping is disabled
    pub fn from_config(ledger: Arc<dyn BillingLedger>, config: &LedgerConfig) -> Option<Self> {
        if config.sweep_interval_secs == 0 {
            return None;
        }
        Some(Self::new(
            ledger,
            Duration::from_secs(config.pending_grace_secs),
            Duration::from_secs(config.sweep_interval_secs),
        ))
    }

    /// Report every record pending longer than the grace period
    ///
    /// Returns the number of records reported.
    pub async fn sweep_once(&self) -> AppResult<usize> {
        let grace = chrono::Duration::from_std(self.grace).unwrap_or(chrono::Duration::zero());
        let cutoff = Utc::now() - grace;

        let pending = self.ledger.list_pending(cutoff).await?;
        for record in &pending {
            error!(
                guid = %record.guid,
                customer_id = record.customer_id,
                amount = record.amount,
                created_at = %record.created_at,
                "Billing record still pending; balances need reconciliation"
            );
        }

        debug!("Pending sweep found {} record(s)", pending.len());
        Ok(pending.len())
    }

    /// Sweep on an interval until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        info!("Pending billing sweeper started (every {:?})", self.interval);
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!("Pending billing sweep failed: {}", e);
                    }
                }
            }
        }

        info!("Pending billing sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use kiosk_core::models::{BillingRecord, LedgerStatus};
    use uuid::Uuid;

    struct StubLedger {
        pending: Vec<BillingRecord>,
    }

    #[async_trait]
    impl BillingLedger for StubLedger {
        async fn append(&self, _record: &BillingRecord) -> AppResult<bool> {
            Ok(true)
        }

        async fn confirm(&self, _guid: Uuid) -> AppResult<bool> {
            Ok(true)
        }

        async fn void(&self, _guid: Uuid) -> AppResult<bool> {
            Ok(true)
        }

        async fn status(&self, guid: Uuid) -> AppResult<Option<LedgerStatus>> {
            Ok(self.pending.iter().find(|r| r.guid == guid).map(|r| r.status))
        }

        async fn list_pending(&self, older_than: DateTime<Utc>) -> AppResult<Vec<BillingRecord>> {
            Ok(self
                .pending
                .iter()
                .filter(|r| r.created_at < older_than)
                .cloned()
                .collect())
        }
    }

    fn pending_record(age: chrono::Duration) -> BillingRecord {
        BillingRecord {
            guid: Uuid::new_v4(),
            rfid: "{A1B2C3}".to_string(),
            setup_id: 1,
            customer_id: 1,
            pre_amount: 10,
            amount: 4,
            post_amount: 6,
            customer_main_amount_used: 4,
            customer_bonus_amount_used: 0,
            created_at: Utc::now() - age,
            log_device_ip: "10.0.0.5".to_string(),
            log_game: "Racer".to_string(),
            name: "Ana".to_string(),
            email: String::new(),
            phone: String::new(),
            is_deleted: false,
            center_code: "CENTER_1".to_string(),
            status: LedgerStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_sweep_reports_only_stale_records() {
        let ledger = Arc::new(StubLedger {
            pending: vec![
                pending_record(chrono::Duration::minutes(10)),
                pending_record(chrono::Duration::zero()),
            ],
        });
        let sweeper = PendingSweeper::new(ledger, Duration::from_secs(60), Duration::from_secs(1));

        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
    }

    #[test]
    fn test_zero_interval_disables_sweeper() {
        let ledger = Arc::new(StubLedger { pending: vec![] });
        let config = LedgerConfig {
            pending_grace_secs: 60,
            sweep_interval_secs: 0,
        };
        assert!(PendingSweeper::from_config(ledger, &config).is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let ledger = Arc::new(StubLedger { pending: vec![] });
        let sweeper = PendingSweeper::new(ledger, Duration::from_secs(60), Duration::from_millis(10));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(sweeper.run(cancel.clone()));
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper must stop when cancelled")
            .unwrap();
    }
}
