use thiserror::Error;

/// ATT protocol error codes a GATT server may answer a request with instead of a value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[repr(u8)]
pub enum AttError {
  #[error("invalid handle")]
  InvalidHandle = 0x01,
  #[error("read not permitted")]
  ReadNotPermitted = 0x02,
  #[error("write not permitted")]
  WriteNotPermitted = 0x03,
  #[error("invalid PDU")]
  InvalidPdu = 0x04,
  #[error("insufficient authentication")]
  InsufficientAuthentication = 0x05,
  #[error("request not supported")]
  RequestNotSupported = 0x06,
  #[error("invalid offset")]
  InvalidOffset = 0x07,
  #[error("insufficient authorization")]
  InsufficientAuthorization = 0x08,
  #[error("prepare queue full")]
  PrepareQueueFull = 0x09,
  #[error("attribute not found")]
  AttributeNotFound = 0x0A,
  #[error("attribute not long")]
  AttributeNotLong = 0x0B,
  #[error("insufficient encryption key size")]
  InsufficientKeySize = 0x0C,
  #[error("invalid attribute value length")]
  InvalidAttributeValueLength = 0x0D,
  #[error("unlikely error")]
  Unlikely = 0x0E,
  #[error("insufficient encryption")]
  InsufficientEncryption = 0x0F,
  #[error("unsupported group type")]
  UnsupportedGroupType = 0x10,
  #[error("insufficient resources")]
  InsufficientResources = 0x11,
}

impl AttError {
  pub fn code(self) -> u8 {
    self as u8
  }
}

impl From<AttError> for u8 {
  fn from(value: AttError) -> Self {
    value.code()
  }
}
