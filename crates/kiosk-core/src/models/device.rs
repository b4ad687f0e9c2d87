//! Device, setup and game models
//!
//! A device is identified by its MAC address and points at a setup, which
//! carries the price of one play and the game it belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    /// Device accepts taps
    #[default]
    Active,
    /// Device is registered but disabled
    Inactive,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Active => write!(f, "ACTIVE"),
            DeviceStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

impl DeviceStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(DeviceStatus::Active),
            "INACTIVE" => Some(DeviceStatus::Inactive),
            _ => None,
        }
    }
}

/// Physical arcade device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i32,

    /// MAC address as sent on the wire, without angle brackets
    pub device_mac: String,

    /// Price point the device is configured with
    pub setup_id: Option<i32>,

    pub status: DeviceStatus,

    /// Opaque tenant tag, copied onto billing records
    pub center_code: String,
}

impl Device {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }
}

/// Price point of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setup {
    pub id: i32,

    /// Cost of one play
    pub amount: i32,

    pub device_type: String,

    pub game_id: Option<i32>,

    pub center_code: String,
}

/// Game, used only for the billing label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: i32,
    pub game_name: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_status_parse() {
        assert_eq!(DeviceStatus::from_str("active"), Some(DeviceStatus::Active));
        assert_eq!(DeviceStatus::from_str("INACTIVE"), Some(DeviceStatus::Inactive));
        assert_eq!(DeviceStatus::from_str("retired"), None);
        assert_eq!(DeviceStatus::Active.to_string(), "ACTIVE");
    }
}
