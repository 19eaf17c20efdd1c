use core::fmt::{Display, Formatter};
use core::str::FromStr;

use thiserror::Error;

/// 48-bit Bluetooth device address, most significant byte first (the order it is written in
/// `AA:BB:CC:DD:EE:FF` form).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BluetoothAddress(pub [u8; 6]);

impl BluetoothAddress {
  pub const fn any() -> Self {
    Self([0; 6])
  }
}

impl Display for BluetoothAddress {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let [a, b, c, d, e, g] = self.0;
    write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bluetooth address: {0:?}")]
pub struct AddressParseError(String);

impl FromStr for BluetoothAddress {
  type Err = AddressParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = || AddressParseError(s.to_owned());
    let mut octets = [0u8; 6];
    let mut parts = s.split(':');
    for octet in octets.iter_mut() {
      let part = parts.next().ok_or_else(err)?;
      if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(err());
      }
      *octet = u8::from_str_radix(part, 16).map_err(|_| err())?;
    }
    if parts.next().is_some() {
      return Err(err());
    }
    Ok(Self(octets))
  }
}
