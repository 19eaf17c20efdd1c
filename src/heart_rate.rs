//! The Heart Rate profile as served by this peripheral: the fixed GATT tree and the
//! measurement values returned to readers.

use core::ops::RangeInclusive;

use enumset::enum_set;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::descriptors::{
  GattCharacteristic, GattCharacteristicPermission, GattCharacteristicProperty, GattService,
  GattServiceType, UUID,
};

pub const HEART_RATE_SERVICE_UUID: UUID = UUID::Long(0x0000180d_0000_1000_8000_00805f9b34fb);
pub const HEART_RATE_MEASUREMENT_UUID: UUID = UUID::Long(0x00002a37_0000_1000_8000_00805f9b34fb);

/// Range simulated measurements are drawn from, in beats per minute.
pub const SIMULATED_BPM: RangeInclusive<u8> = 60..=100;

/// Flags byte value: heart rate is a UINT8, no sensor contact, energy or RR-interval fields.
pub const FLAGS_UINT8_FORMAT: u8 = 0x00;

/// The single primary service this peripheral publishes.  The measurement characteristic
/// declares `notify` for compatibility with standard heart rate monitors but is only ever
/// served through reads.
pub fn heart_rate_service() -> GattService {
  GattService {
    uuid: HEART_RATE_SERVICE_UUID,
    service_type: GattServiceType::Primary,
    characteristics: vec![GattCharacteristic {
      uuid: HEART_RATE_MEASUREMENT_UUID,
      properties: enum_set!(GattCharacteristicProperty::Notify),
      permissions: enum_set!(GattCharacteristicPermission::Read),
    }],
  }
}

/// Value of the Heart Rate Measurement characteristic.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeartRateMeasurement {
  pub bpm: u8,
}

impl HeartRateMeasurement {
  pub const ENCODED_LEN: usize = 2;

  pub fn new(bpm: u8) -> Self {
    Self { bpm }
  }

  pub fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
    [FLAGS_UINT8_FORMAT, self.bpm]
  }
}

/// Where measurement values come from.
pub trait HeartRateSource {
  fn next_bpm(&mut self) -> u8;
}

/// Uniformly samples [SIMULATED_BPM] on every call.
#[derive(Debug, Clone)]
pub struct RandomHeartRate {
  rng: StdRng,
}

impl RandomHeartRate {
  pub fn new() -> Self {
    Self {
      rng: StdRng::from_entropy(),
    }
  }

  /// Deterministic sequence for reproducible runs.
  pub fn seeded(seed: u64) -> Self {
    Self {
      rng: StdRng::seed_from_u64(seed),
    }
  }
}

impl Default for RandomHeartRate {
  fn default() -> Self {
    Self::new()
  }
}

impl HeartRateSource for RandomHeartRate {
  fn next_bpm(&mut self) -> u8 {
    self.rng.gen_range(SIMULATED_BPM)
  }
}

impl<F> HeartRateSource for F
where
  F: FnMut() -> u8,
{
  fn next_bpm(&mut self) -> u8 {
    (self)()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn service_tree_is_one_primary_with_one_characteristic() {
    let service = heart_rate_service();
    assert_eq!(service.uuid.to_string(), "0000180d-0000-1000-8000-00805f9b34fb");
    assert_eq!(service.service_type, GattServiceType::Primary);
    assert_eq!(service.characteristics.len(), 1);

    let characteristic = &service.characteristics[0];
    assert_eq!(characteristic.uuid.to_string(), "00002a37-0000-1000-8000-00805f9b34fb");
    assert_eq!(characteristic.properties, enum_set!(GattCharacteristicProperty::Notify));
    assert_eq!(characteristic.permissions, enum_set!(GattCharacteristicPermission::Read));
    assert!(characteristic.is_readable());
    assert!(characteristic.is_subscribable());
  }

  #[test]
  fn measurement_encoding() {
    assert_eq!(HeartRateMeasurement::new(72).to_bytes(), [0x00, 72]);
  }

  #[test]
  fn random_source_stays_in_range_and_covers_bounds() {
    let mut source = RandomHeartRate::seeded(7);
    let samples: Vec<u8> = (0..5_000).map(|_| source.next_bpm()).collect();
    assert!(samples.iter().all(|bpm| SIMULATED_BPM.contains(bpm)));
    assert!(samples.contains(&60));
    assert!(samples.contains(&100));
  }

  #[test]
  fn seeded_sources_repeat() {
    let mut a = RandomHeartRate::seeded(42);
    let mut b = RandomHeartRate::seeded(42);
    for _ in 0..16 {
      assert_eq!(a.next_bpm(), b.next_bpm());
    }
  }
}
