use core::fmt::{Display, Formatter};
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::advertisement::{AdvertisementPayload, AdvertisementPayloadBuilder, PushError};
use crate::descriptors::UUID;

/// Everything needed to ask a platform to start legacy BLE advertising.  Only the service
/// UUIDs go into the advertisement; characteristic data is never advertised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingConfig {
  /// Whether a central may connect in response to the advertisement.
  pub is_connectable: bool,
  pub mode: AdvertiseMode,
  pub tx_power: TxPowerLevel,

  /// Include the local device name in the advertisement packet.
  pub include_device_name: bool,
  pub service_uuids: Vec<UUID>,
}

impl AdvertisingConfig {
  /// Encode the advertising PDU for this configuration.  `device_name` is only used when
  /// [AdvertisingConfig::include_device_name] is set, and is shortened to whatever room the
  /// service UUIDs leave in the packet.
  pub fn payload(&self, device_name: Option<&str>) -> Result<AdvertisementPayload, PushError> {
    let mut builder = AdvertisementPayloadBuilder::new();
    if !self.service_uuids.is_empty() {
      builder = builder.push_service_uuids(&self.service_uuids)?;
    }
    if let Some(name) = device_name.filter(|_| self.include_device_name) {
      builder = builder.push_local_name(name)?;
    }
    builder.build()
  }
}

/// Trade-off between discovery latency and power, expressed as the advertising interval.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvertiseMode {
  LowPower,
  Balanced,
  #[default]
  LowLatency,
}

impl AdvertiseMode {
  pub fn interval(self) -> Duration {
    match self {
      AdvertiseMode::LowPower => Duration::from_millis(1000),
      AdvertiseMode::Balanced => Duration::from_millis(250),
      AdvertiseMode::LowLatency => Duration::from_millis(100),
    }
  }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPowerLevel {
  UltraLow,
  Low,
  Medium,
  #[default]
  High,
}

impl TxPowerLevel {
  pub fn dbm(self) -> i16 {
    match self {
      TxPowerLevel::UltraLow => -21,
      TxPowerLevel::Low => -15,
      TxPowerLevel::Medium => -7,
      TxPowerLevel::High => 1,
    }
  }
}

/// Reasons a platform gives for refusing to advertise, keyed by their numeric codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AdvertiseFailure {
  /// The advertisement does not fit in the PDU.
  DataTooLarge,

  /// No advertising instance is free.
  TooManyAdvertisers,

  AlreadyStarted,
  InternalError,
  FeatureUnsupported,
  Other(i32),
}

impl AdvertiseFailure {
  pub fn code(self) -> i32 {
    self.into()
  }
}

impl From<i32> for AdvertiseFailure {
  fn from(value: i32) -> Self {
    match value {
      1 => AdvertiseFailure::DataTooLarge,
      2 => AdvertiseFailure::TooManyAdvertisers,
      3 => AdvertiseFailure::AlreadyStarted,
      4 => AdvertiseFailure::InternalError,
      5 => AdvertiseFailure::FeatureUnsupported,
      o => AdvertiseFailure::Other(o),
    }
  }
}

impl From<AdvertiseFailure> for i32 {
  fn from(value: AdvertiseFailure) -> Self {
    match value {
      AdvertiseFailure::DataTooLarge => 1,
      AdvertiseFailure::TooManyAdvertisers => 2,
      AdvertiseFailure::AlreadyStarted => 3,
      AdvertiseFailure::InternalError => 4,
      AdvertiseFailure::FeatureUnsupported => 5,
      AdvertiseFailure::Other(o) => o,
    }
  }
}

impl Display for AdvertiseFailure {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{self:?} (code {})", self.code())
  }
}
