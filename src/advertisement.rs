use core::ops::Deref;

use thiserror::Error;

use crate::descriptors::UUID;

/// Legacy advertising PDUs carry at most 31 bytes of AD structures.
pub const LEGACY_ADV_PAYLOAD_LEN: usize = 31;

pub type AdvertisementPayloadBuilder = RawAdvertisementBuilder<LEGACY_ADV_PAYLOAD_LEN>;

/// Helper to facilitate creating correctly structured advertisement PDUs.  The flags record
/// is always emitted first; unless set explicitly it defaults to general discoverable with
/// BR/EDR not supported.
#[derive(Debug, Default, Clone)]
pub struct RawAdvertisementBuilder<const N: usize> {
  raw: heapless::Vec<u8, N>,
  flags: Option<u8>,
  has_set_flags: bool,
}

impl<const N: usize> RawAdvertisementBuilder<N> {
  pub fn new() -> Self {
    Default::default()
  }

  /// Set the discover mode.  Must be called before any record is pushed.
  pub fn set_discover_mode(mut self, discover_mode: DiscoverMode) -> Self {
    let flags = self.flags.get_or_insert(0);
    *flags = (*flags & !DISCOVER_MODE_MASK) | (discover_mode as u8 & DISCOVER_MODE_MASK);
    self
  }

  /// Indicate that Bluetooth Classic (BR/EDR) is _NOT_ supported.
  pub fn set_classic_not_supported(mut self, classic_not_supported: bool) -> Self {
    let flags = self.flags.get_or_insert(0);
    if classic_not_supported {
      *flags |= CLASSIC_NOT_SUPPORTED_MASK;
    } else {
      *flags &= !CLASSIC_NOT_SUPPORTED_MASK;
    }
    self
  }

  /// Push the complete list of service UUIDs.  All UUIDs must share the same width.
  pub fn push_service_uuids(mut self, uuids: &[UUID]) -> Result<Self, PushError> {
    let size_of_item = Self::require_equal_size(uuids)?;
    let ad_type = match size_of_item {
      2 => AdType::CompleteServiceUuids16,
      _ => AdType::CompleteServiceUuids128,
    };

    self = self.push_start_record(ad_type as _, size_of_item * uuids.len())?;
    for uuid in uuids {
      uuid.push_into(&mut self.raw).map_err(|_| PushError::CapacityExceeded)?;
    }

    Ok(self)
  }

  fn require_equal_size(uuids: &[UUID]) -> Result<usize, PushError> {
    let mut num_bytes = None;
    for uuid in uuids {
      let size_of = uuid.encoded_len();
      if num_bytes.get_or_insert(size_of) != &size_of {
        return Err(PushError::UuidInputError);
      }
    }
    num_bytes.ok_or(PushError::UuidInputError)
  }

  /// Push the local name.  If the full name does not fit in the remaining space it is cut
  /// (on a character boundary) and tagged as [AdType::ShortenedLocalName], so scanners know
  /// to read the full name from the GAP service after connecting.
  pub fn push_local_name(mut self, name: &str) -> Result<Self, PushError> {
    self = self.ensure_defaults_set()?;
    self = self.flush_pending_record()?;

    let available = N.saturating_sub(self.raw.len() + 2);
    if name.len() <= available {
      return self.push_raw_ad_type(AdType::CompleteLocalName as _, name.as_bytes());
    }

    let mut cut = available;
    while !name.is_char_boundary(cut) {
      cut -= 1;
    }
    if cut == 0 {
      return Err(PushError::CapacityExceeded);
    }
    self.push_raw_ad_type(AdType::ShortenedLocalName as _, &name.as_bytes()[..cut])
  }

  pub fn push_raw_ad_type(mut self, ad_type: u8, data: &[u8]) -> Result<Self, PushError> {
    if ad_type == AdType::Flags as u8 {
      self.has_set_flags = true;
    }

    self = self.push_start_record(ad_type, data.len())?;
    self
      .raw
      .extend_from_slice(data)
      .map_err(|_| PushError::CapacityExceeded)?;
    Ok(self)
  }

  fn push_start_record(mut self, ad_type: u8, remaining_size: usize) -> Result<Self, PushError> {
    self = self.ensure_defaults_set()?;
    self = self.flush_pending_record()?;

    if self.raw.len() + 2 + remaining_size > N {
      return Err(PushError::CapacityExceeded);
    }

    let length = u8::try_from(remaining_size + 1).map_err(|_| PushError::CapacityExceeded)?;
    self.raw.push(length).map_err(|_| PushError::CapacityExceeded)?;
    self.raw.push(ad_type).map_err(|_| PushError::CapacityExceeded)?;
    Ok(self)
  }

  pub fn build(mut self) -> Result<RawAdvertisement<N>, PushError> {
    self = self.ensure_defaults_set()?;
    self = self.flush_pending_record()?;
    Ok(RawAdvertisement(self.raw))
  }

  fn flush_pending_record(mut self) -> Result<Self, PushError> {
    if let Some(flags) = self.flags.take() {
      self = self.push_raw_ad_type(AdType::Flags as _, &[flags])?;
    }
    Ok(self)
  }

  fn ensure_defaults_set(mut self) -> Result<Self, PushError> {
    if !self.has_set_flags && self.flags.is_none() {
      self = self.set_discover_mode(DiscoverMode::General);
      self = self.set_classic_not_supported(true);
      self.has_set_flags = true;
    }
    Ok(self)
  }
}

/// Advertisements consist of one or more ad type units in a TLV-style format (but actually it's
/// LTV).  Note that this list is not exhaustive but is provided as a convenience.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum AdType {
  Flags = 0x01,
  PartialServiceUuids16 = 0x02,
  CompleteServiceUuids16 = 0x03,
  PartialServiceUuids32 = 0x04,
  CompleteServiceUuids32 = 0x05,
  PartialServiceUuids128 = 0x06,
  CompleteServiceUuids128 = 0x07,
  ShortenedLocalName = 0x08,
  CompleteLocalName = 0x09,
  TxPowerLevel = 0x0a,
  ServiceData16 = 0x16,
  Appearance = 0x19,
  ServiceData128 = 0x21,
  ManufacturerData = 0xff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
  #[error("advertisement exceeds the PDU capacity")]
  CapacityExceeded,
  #[error("service UUID list is empty or mixes UUID widths")]
  UuidInputError,
}

const DISCOVER_MODE_MASK: u8 = 0b0000_0011;
const CLASSIC_NOT_SUPPORTED_MASK: u8 = 0b0000_0100;

/// Whether and how this peripheral is discovered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DiscoverMode {
  /// This device can only be discovered when a central device is following the limited
  /// discovery procedure.
  Limited = 0b0000_0001,

  /// General discovery.  This is the normal discovery mode that most customers would use.
  General = 0b0000_0010,

  /// Device is not discoverable (whether the device is connectable is determined independently).
  None = 0b0000_0000,
}

/// Represents the raw payload for an advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAdvertisement<const N: usize>(pub heapless::Vec<u8, N>);

impl<const N: usize> RawAdvertisement<N> {
  /// Walk the AD structures.  Iteration stops at the first malformed or zero-length record.
  pub fn records(&self) -> AdRecords<'_> {
    AdRecords { remaining: &self.0 }
  }

  /// The local name carried by the advertisement, complete or shortened.
  pub fn local_name(&self) -> Option<&str> {
    self
      .records()
      .find(|r| {
        r.ad_type == AdType::CompleteLocalName as u8 || r.ad_type == AdType::ShortenedLocalName as u8
      })
      .and_then(|r| core::str::from_utf8(r.data).ok())
  }
}

impl<const N: usize> Deref for RawAdvertisement<N> {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

pub type AdvertisementPayload = RawAdvertisement<LEGACY_ADV_PAYLOAD_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdRecord<'a> {
  pub ad_type: u8,
  pub data: &'a [u8],
}

pub struct AdRecords<'a> {
  remaining: &'a [u8],
}

impl<'a> Iterator for AdRecords<'a> {
  type Item = AdRecord<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    let (&length, rest) = self.remaining.split_first()?;
    let length = usize::from(length);
    if length < 1 || rest.len() < length {
      self.remaining = &[];
      return None;
    }
    let (record, rest) = rest.split_at(length);
    self.remaining = rest;
    Some(AdRecord {
      ad_type: record[0],
      data: &record[1..],
    })
  }
}
