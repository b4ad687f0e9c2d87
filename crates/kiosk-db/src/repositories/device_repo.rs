//! Device and setup repository implementation
//!
//! Read-only lookups resolving a device MAC to its price point.

use async_trait::async_trait;
use kiosk_core::{
    models::{Device, DeviceStatus, Setup},
    traits::{DeviceStore, SetupStore},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of DeviceStore and SetupStore
pub struct PgDeviceRepository {
    pool: PgPool,
}

impl PgDeviceRepository {
    /// Create a new device repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PgDeviceRepository {
    #[instrument(skip(self))]
    async fn get_by_mac(&self, mac: &str) -> AppResult<Option<Device>> {
        debug!("Finding active device by mac: {}", mac);

        let result = sqlx::query_as::<sqlx::Postgres, DeviceRow>(
            r#"
            SELECT id, device_mac, setup_id, status, center_code
            FROM es_device
            WHERE device_mac = $1
              AND status = 'ACTIVE'
            LIMIT 1
            "#,
        )
        .bind(mac)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding device {}: {}", mac, e);
            AppError::Database(format!("Failed to find device: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl SetupStore for PgDeviceRepository {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Setup>> {
        debug!("Finding setup by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, SetupRow>(
            r#"
            SELECT id, amount, device_type, game_id, center_code
            FROM es_setup
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding setup {}: {}", id, e);
            AppError::Database(format!("Failed to find setup: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    id: i32,
    device_mac: String,
    setup_id: Option<i32>,
    status: String,
    center_code: String,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            id: row.id,
            device_mac: row.device_mac,
            setup_id: row.setup_id,
            status: DeviceStatus::from_str(&row.status).unwrap_or(DeviceStatus::Inactive),
            center_code: row.center_code,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SetupRow {
    id: i32,
    amount: i32,
    device_type: String,
    game_id: Option<i32>,
    center_code: String,
}

impl From<SetupRow> for Setup {
    fn from(row: SetupRow) -> Self {
        Self {
            id: row.id,
            amount: row.amount,
            device_type: row.device_type,
            game_id: row.game_id,
            center_code: row.center_code,
        }
    }
}
