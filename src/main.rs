//! RFID kiosk authorization server
//!
//! Answers balance-authorization datagrams from arcade devices: looks up the
//! tapped card and the device's price, debits the play and records it.

use anyhow::Context;
use kiosk_core::{config::LogConfig, AppConfig};
use kiosk_db::{
    create_pool, run_migrations, PgBillingLedger, PgCustomerRepository, PgDeviceRepository,
    PgGameRepository,
};
use kiosk_services::{PendingSweeper, RfidAuthorizationService, Stores};
use kiosk_udp::UdpServer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is not set
fn default_filter(level: &str) -> String {
    format!(
        "kiosk_rfid={level},kiosk_services={level},kiosk_udp={level},kiosk_db={level},sqlx=warn",
        level = level
    )
}

/// Initialize tracing/logging
fn init_tracing(config: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config.log);

    info!("Starting RFID kiosk server v{}", env!("CARGO_PKG_VERSION"));
    info!("Binding UDP on {}", config.udp.bind_addr());

    let pool = create_pool(&config.database)
        .await
        .context("failed to create database pool")?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
    }

    let devices = Arc::new(PgDeviceRepository::new(pool.clone()));
    let ledger = Arc::new(PgBillingLedger::new(pool.clone()));
    let stores = Stores {
        customers: Arc::new(PgCustomerRepository::new(pool.clone())),
        devices: devices.clone(),
        setups: devices,
        games: Arc::new(PgGameRepository::new(pool.clone())),
        ledger: ledger.clone(),
    };

    let service = Arc::new(RfidAuthorizationService::new(stores));
    let server = UdpServer::bind(&config.udp, service)
        .await
        .context("failed to bind UDP socket")?;

    let cancel = CancellationToken::new();

    let sweeper = match PendingSweeper::from_config(ledger, &config.ledger) {
        Some(sweeper) => Some(tokio::spawn(sweeper.run(cancel.clone()))),
        None => {
            warn!("Pending billing sweeper disabled");
            None
        }
    };

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
            cancel.cancel();
        });
    }

    let result = server.run(cancel.clone()).await;
    cancel.cancel();

    if let Some(sweeper) = sweeper {
        if let Err(e) = sweeper.await {
            error!("Pending billing sweeper task failed: {}", e);
        }
    }

    pool.close().await;
    info!("RFID kiosk server stopped");

    result.context("UDP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_all_crates() {
        let filter = default_filter("debug");
        for target in ["kiosk_rfid", "kiosk_services", "kiosk_udp", "kiosk_db"] {
            assert!(filter.contains(&format!("{}=debug", target)));
        }
        assert!(filter.ends_with("sqlx=warn"));
    }
}
