//! Error types for the peripheral and the platform boundary it drives.

use thiserror::Error;

use crate::controller::PeripheralState;
use crate::gap_advertiser::AdvertiseFailure;

/// Failures reported by a [crate::gateway::BleAdapterGateway] implementation.
#[derive(Error, Debug)]
pub enum GatewayError {
  #[error("missing bluetooth permission")]
  PermissionDenied,

  #[error("bluetooth radio is unavailable")]
  RadioUnavailable,

  #[error("advertising is already running")]
  AlreadyAdvertising,

  #[error("advertising rejected by the platform: {0}")]
  PlatformRejected(AdvertiseFailure),

  #[error("platform error: {0}")]
  Platform(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GatewayError {
  pub fn platform(error: impl std::error::Error + Send + Sync + 'static) -> Self {
    GatewayError::Platform(Box::new(error))
  }

  /// Numeric advertise failure code, where the platform supplied one.
  pub fn advertise_failure(&self) -> Option<AdvertiseFailure> {
    match self {
      GatewayError::AlreadyAdvertising => Some(AdvertiseFailure::AlreadyStarted),
      GatewayError::PlatformRejected(reason) => Some(*reason),
      _ => None,
    }
  }
}

/// Why a peripheral session could not be brought up.  Every variant is terminal for the
/// session; nothing is retried.
#[derive(Error, Debug)]
pub enum PeripheralError {
  #[error("missing bluetooth permission")]
  PermissionDenied,

  #[error("bluetooth radio is disabled")]
  RadioUnavailable,

  #[error("failed to register GATT server")]
  ServerRegistrationFailed(#[source] GatewayError),

  #[error("failed to start advertising")]
  AdvertisingRejected(#[source] GatewayError),

  #[error("peripheral is {0:?}")]
  InvalidState(PeripheralState),
}

impl PeripheralError {
  /// Platform code attached to an advertising rejection.
  pub fn platform_code(&self) -> Option<i32> {
    match self {
      PeripheralError::AdvertisingRejected(e) => e.advertise_failure().map(AdvertiseFailure::code),
      _ => None,
    }
  }
}
