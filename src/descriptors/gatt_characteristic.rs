use crate::descriptors::uuid::UUID;
use enumset::EnumSet;

#[derive(Debug, Clone, PartialEq)]
pub struct GattCharacteristic {
  pub uuid: UUID,
  pub properties: EnumSet<GattCharacteristicProperty>,
  pub permissions: EnumSet<GattCharacteristicPermission>,
}

impl Default for GattCharacteristic {
  fn default() -> Self {
    Self {
      uuid: UUID::Long(0),
      properties: EnumSet::new(),
      permissions: EnumSet::new(),
    }
  }
}

impl GattCharacteristic {
  /// Whether a peer may read this characteristic, either because the property is advertised
  /// or because the attribute permissions allow it.
  pub fn is_readable(&self) -> bool {
    self.properties.contains(GattCharacteristicProperty::Read)
      || self.permissions.contains(GattCharacteristicPermission::Read)
      || self.permissions.contains(GattCharacteristicPermission::ReadEncrypted)
  }

  pub fn is_subscribable(&self) -> bool {
    self.properties.contains(GattCharacteristicProperty::Notify)
      || self.properties.contains(GattCharacteristicProperty::Indicate)
  }
}

#[derive(Debug, enumset::EnumSetType)]
pub enum GattCharacteristicProperty {
  Broadcast,
  ExtendedProps,

  /// Note that setting this property will cause a CCCD descriptor to automatically be added
  /// to the characteristic.
  Indicate,

  /// Note that setting this property will cause a CCCD descriptor to automatically be added
  /// to the characteristic.
  Notify,

  Read,
  Write,
  WriteSigned,
  WriteNoResponse,
}

#[derive(Debug, enumset::EnumSetType)]
pub enum GattCharacteristicPermission {
  Read,
  ReadEncrypted,
  Write,
  WriteEncrypted,
  WriteEncryptedMitm,
  WriteSigned,
  WriteSignedMitm,
}
