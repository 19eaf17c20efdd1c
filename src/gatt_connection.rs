use core::fmt::{Display, Formatter};

use crate::bluetooth_address::BluetoothAddress;
use crate::descriptors::UUID;

/// Identifier a platform stack attaches to an inbound request so that the response can be
/// correlated with it.  Must be echoed back unchanged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u32);

impl Display for RequestId {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Link state of a central as last reported by the platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
  Connected,
  Disconnected,
}

/// A peer asking for the value of a characteristic.  Created by the platform stack for each
/// inbound ATT read and consumed synchronously by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
  pub device: BluetoothAddress,
  pub request_id: RequestId,

  /// Byte offset into the attribute value the peer wants to read from.  Non-zero for the
  /// follow-up reads of a long read.
  pub offset: u16,

  pub characteristic: UUID,
}

/// Successful answer to a [ReadRequest].
#[derive(Debug, PartialEq, Eq)]
pub struct Response<'a> {
  /// Echo of the request offset.
  pub offset: u16,

  /// Value starting at `offset`.
  pub value: &'a [u8],
}

impl<'a> Response<'a> {
  pub fn new(offset: u16, value: &'a [u8]) -> Self {
    Self { offset, value }
  }
}
