use core::fmt::Debug;

use crate::att_error::AttError;
use crate::descriptors::GattService;
use crate::error::GatewayError;
use crate::gap_advertiser::AdvertisingConfig;
use crate::gatt_connection::{ReadRequest, Response};
use crate::gatt_server_cb::EventSender;

/// The capabilities of the local Bluetooth radio that a peripheral needs, and nothing more.
///
/// The radio itself is process-wide state; implementations receive a shared handle to it at
/// construction rather than reaching for a global, so that tests can substitute a fake.
///
/// Calls may block.  Outcomes that the platform only learns later (advertising starting,
/// centrals connecting, read requests) are pushed into the [EventSender] given when the
/// server or advertiser was started, possibly from another thread.
pub trait BleAdapterGateway {
  type ServerHandle: Debug;
  type AdvertisingHandle: Debug;

  /// True iff the radio is powered and usable.
  fn is_radio_enabled(&self) -> bool;

  /// True iff the process holds whatever authorization the platform requires to advertise
  /// and to run a GATT server.  Platforms without such a concept always return true.
  fn has_required_permissions(&self) -> bool;

  /// Set the name peers see in the advertisement and in the GAP device name characteristic.
  fn set_device_name(&mut self, name: &str) -> Result<(), GatewayError>;

  /// Register `service` with the platform GATT server.  Read requests and connection changes
  /// are delivered through `events` until the server is closed.
  fn open_gatt_server(
    &mut self,
    service: &GattService,
    events: EventSender,
  ) -> Result<Self::ServerHandle, GatewayError>;

  /// Unregister the server.  Idempotent: closing an already closed handle is a no-op.
  fn close_gatt_server(&mut self, server: &mut Self::ServerHandle);

  /// Request that advertising begins.  Success or failure that the platform determines
  /// asynchronously is reported through `events`.
  fn start_advertising(
    &mut self,
    config: &AdvertisingConfig,
    events: EventSender,
  ) -> Result<Self::AdvertisingHandle, GatewayError>;

  /// Stop advertising.  Idempotent: stopping an already stopped handle is a no-op.
  fn stop_advertising(&mut self, advertiser: &mut Self::AdvertisingHandle);

  /// Answer a read request, either with a value or with an ATT error.  Requests that are
  /// never answered time out on the central side.
  fn send_response(
    &mut self,
    request: &ReadRequest,
    response: Result<Response<'_>, AttError>,
  ) -> Result<(), GatewayError>;
}
