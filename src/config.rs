use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gap_advertiser::{AdvertiseMode, AdvertisingConfig, TxPowerLevel};
use crate::heart_rate::HEART_RATE_SERVICE_UUID;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid configuration: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Tunables of a peripheral session.  Every field has a default, so an empty JSON object is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeripheralConfig {
  /// Overrides the platform's device name when set.
  pub device_name: Option<String>,
  pub advertise_mode: AdvertiseMode,
  pub tx_power: TxPowerLevel,
  pub include_device_name: bool,

  /// Default `env_logger` filter; `RUST_LOG` takes precedence.
  pub log_filter: String,
}

impl Default for PeripheralConfig {
  fn default() -> Self {
    Self {
      device_name: None,
      advertise_mode: AdvertiseMode::LowLatency,
      tx_power: TxPowerLevel::High,
      include_device_name: true,
      log_filter: default_log_filter(),
    }
  }
}

fn default_log_filter() -> String {
  "info".to_string()
}

impl PeripheralConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_owned(),
      source,
    })?;
    Self::from_json(&contents)
  }

  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Connectable advertising of the heart rate service UUID alone.
  pub fn advertising(&self) -> AdvertisingConfig {
    AdvertisingConfig {
      is_connectable: true,
      mode: self.advertise_mode,
      tx_power: self.tx_power,
      include_device_name: self.include_device_name,
      service_uuids: vec![HEART_RATE_SERVICE_UUID],
    }
  }
}
