use core::cmp::Ordering;
use core::fmt::{Display, Formatter};
use core::hash::{Hash, Hasher};
use core::str::FromStr;

/// `00000000-0000-1000-8000-00805f9b34fb`, the base onto which SIG assigned 16-bit aliases
/// are expanded.
pub const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// A BLE attribute UUID.  Both forms identify a full 128-bit value: two UUIDs compare equal
/// when their expanded values match, regardless of which variant was used to spell them.
#[derive(Debug, Copy, Clone)]
pub enum UUID {
  /// For use only with SIG defined services (i.e. registered and publicly well known services).
  Short(u16),

  /// All other BLE UUIDs must be 128-bit
  Long(u128),
}

impl UUID {
  pub const fn as_u128(&self) -> u128 {
    match *self {
      UUID::Short(u) => BLUETOOTH_BASE_UUID | ((u as u128) << 96),
      UUID::Long(u) => u,
    }
  }

  /// Number of bytes this UUID occupies on the air in the form it was declared.
  pub fn encoded_len(&self) -> usize {
    match self {
      UUID::Short(_) => 2,
      UUID::Long(_) => 16,
    }
  }

  pub(crate) fn push_into<const N: usize>(&self, raw: &mut heapless::Vec<u8, N>) -> Result<(), ()> {
    match *self {
      UUID::Short(u) => raw.extend_from_slice(&u.to_le_bytes()),
      UUID::Long(u) => raw.extend_from_slice(&u.to_le_bytes()),
    }
  }
}

impl PartialEq for UUID {
  fn eq(&self, other: &Self) -> bool {
    self.as_u128() == other.as_u128()
  }
}

impl Eq for UUID {}

impl Hash for UUID {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.as_u128().hash(state)
  }
}

impl PartialOrd for UUID {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for UUID {
  fn cmp(&self, other: &Self) -> Ordering {
    self.as_u128().cmp(&other.as_u128())
  }
}

impl Display for UUID {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", uuid::Uuid::from(*self).hyphenated())
  }
}

impl FromStr for UUID {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    uuid::Uuid::parse_str(s).map(UUID::from)
  }
}

impl From<UUID> for uuid::Uuid {
  fn from(value: UUID) -> Self {
    uuid::Uuid::from_u128(value.as_u128())
  }
}

impl From<uuid::Uuid> for UUID {
  fn from(value: uuid::Uuid) -> Self {
    UUID::Long(value.as_u128())
  }
}
