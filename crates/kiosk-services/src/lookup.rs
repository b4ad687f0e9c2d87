//! Device lookup service
//!
//! Resolves the MAC address reported by a device into the price point it
//! charges: device → setup → game. Every link in the chain must exist.

use kiosk_core::{
    models::{Device, Game, Setup},
    traits::{DeviceStore, GameStore, SetupStore},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Everything a device tap is priced against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePoint {
    pub device: Device,
    pub setup: Setup,
    pub game: Game,
}

/// Device lookup service
pub struct DeviceLookup {
    devices: Arc<dyn DeviceStore>,
    setups: Arc<dyn SetupStore>,
    games: Arc<dyn GameStore>,
}

impl DeviceLookup {
    /// Create a new device lookup service
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        setups: Arc<dyn SetupStore>,
        games: Arc<dyn GameStore>,
    ) -> Self {
        Self {
            devices,
            setups,
            games,
        }
    }

    /// Find an active device by MAC
    pub async fn find_device_by_mac(&self, mac: &str) -> AppResult<Device> {
        self.devices
            .get_by_mac(mac)
            .await?
            .ok_or_else(|| AppError::DeviceNotFound(mac.to_string()))
    }

    /// Find a setup by id
    ///
    /// A negative price is treated as a broken setup rather than a credit.
    pub async fn find_setup_by_id(&self, setup_id: i32) -> AppResult<Setup> {
        let setup = self
            .setups
            .get_by_id(setup_id)
            .await?
            .ok_or_else(|| AppError::SetupNotFound(setup_id.to_string()))?;

        if setup.amount < 0 {
            warn!("Setup {} has negative amount {}", setup.id, setup.amount);
            return Err(AppError::InvalidSetup {
                setup_id: setup.id,
                reason: format!("negative amount {}", setup.amount),
            });
        }

        Ok(setup)
    }

    pub async fn find_game_by_id(&self, game_id: i32) -> AppResult<Game> {
        self.games
            .get_by_id(game_id)
            .await?
            .ok_or_else(|| AppError::GameNotFound(game_id.to_string()))
    }

    /// Resolve device, setup and game for a MAC
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound` when no active device carries the MAC
    /// - `SetupNotFound` when the device has no setup or it does not exist
    /// - `InvalidSetup` when the setup price is negative
    /// - `GameNotFound` when the setup has no game or it does not exist
    #[instrument(skip(self))]
    pub async fn resolve(&self, mac: &str) -> AppResult<PricePoint> {
        let device = self.find_device_by_mac(mac).await?;

        let setup_id = device.setup_id.ok_or_else(|| {
            AppError::SetupNotFound(format!("device {} has no setup assigned", device.id))
        })?;
        let setup = self.find_setup_by_id(setup_id).await?;

        let game_id = setup
            .game_id
            .ok_or_else(|| AppError::GameNotFound(format!("setup {} has no game", setup.id)))?;
        let game = self.find_game_by_id(game_id).await?;

        debug!(
            "Resolved MAC {} to setup {} ({} per play, game {})",
            mac, setup.id, setup.amount, game.game_name
        );

        Ok(PricePoint {
            device,
            setup,
            game,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kiosk_core::models::DeviceStatus;

    struct FixedCatalog {
        device: Option<Device>,
        setup: Option<Setup>,
        game: Option<Game>,
    }

    #[async_trait]
    impl DeviceStore for FixedCatalog {
        async fn get_by_mac(&self, _mac: &str) -> AppResult<Option<Device>> {
            Ok(self.device.clone())
        }
    }

    #[async_trait]
    impl SetupStore for FixedCatalog {
        async fn get_by_id(&self, _id: i32) -> AppResult<Option<Setup>> {
            Ok(self.setup.clone())
        }
    }

    #[async_trait]
    impl GameStore for FixedCatalog {
        async fn get_by_id(&self, _id: i32) -> AppResult<Option<Game>> {
            Ok(self.game.clone())
        }
    }

    fn catalog() -> FixedCatalog {
        FixedCatalog {
            device: Some(Device {
                id: 7,
                device_mac: "AA:BB:CC:DD:EE:FF".to_string(),
                setup_id: Some(3),
                status: DeviceStatus::Active,
                center_code: "CENTER_1".to_string(),
            }),
            setup: Some(Setup {
                id: 3,
                amount: 4,
                device_type: "ARCADE".to_string(),
                game_id: Some(9),
                center_code: "CENTER_1".to_string(),
            }),
            game: Some(Game {
                id: 9,
                game_name: "Racer".to_string(),
                status: "ACTIVE".to_string(),
            }),
        }
    }

    fn lookup(catalog: FixedCatalog) -> DeviceLookup {
        let catalog = Arc::new(catalog);
        DeviceLookup::new(catalog.clone(), catalog.clone(), catalog)
    }

    #[tokio::test]
    async fn test_resolve_full_chain() {
        let price = lookup(catalog()).resolve("AA:BB:CC:DD:EE:FF").await.unwrap();
        assert_eq!(price.device.id, 7);
        assert_eq!(price.setup.amount, 4);
        assert_eq!(price.game.game_name, "Racer");
    }

    #[tokio::test]
    async fn test_device_without_setup_is_a_miss() {
        let mut c = catalog();
        if let Some(device) = c.device.as_mut() {
            device.setup_id = None;
        }
        let err = lookup(c).resolve("AA:BB:CC:DD:EE:FF").await.unwrap_err();
        assert!(matches!(err, AppError::SetupNotFound(_)));
    }

    #[tokio::test]
    async fn test_setup_without_game_is_a_miss() {
        let mut c = catalog();
        if let Some(setup) = c.setup.as_mut() {
            setup.game_id = None;
        }
        let err = lookup(c).resolve("AA:BB:CC:DD:EE:FF").await.unwrap_err();
        assert!(matches!(err, AppError::GameNotFound(_)));
    }

    #[tokio::test]
    async fn test_negative_amount_is_invalid() {
        let mut c = catalog();
        if let Some(setup) = c.setup.as_mut() {
            setup.amount = -2;
        }
        let err = lookup(c).resolve("AA:BB:CC:DD:EE:FF").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSetup { setup_id: 3, .. }));
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let mut c = catalog();
        c.device = None;
        let err = lookup(c).resolve("00:00:00:00:00:00").await.unwrap_err();
        assert!(matches!(err, AppError::DeviceNotFound(mac) if mac == "00:00:00:00:00:00"));
    }
}
