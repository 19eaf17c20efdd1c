use std::collections::BTreeSet;

use log::{debug, error, info, trace, warn};

use crate::att_error::AttError;
use crate::bluetooth_address::BluetoothAddress;
use crate::config::PeripheralConfig;
use crate::descriptors::GattService;
use crate::error::PeripheralError;
use crate::gap_advertiser::AdvertiseFailure;
use crate::gateway::BleAdapterGateway;
use crate::gatt_connection::{ConnectionState, ReadRequest, Response};
use crate::gatt_server_cb::{EventSender, GattServerCallback, GattServerEvent};
use crate::heart_rate::{
  heart_rate_service, HeartRateMeasurement, HeartRateSource, RandomHeartRate,
  HEART_RATE_MEASUREMENT_UUID,
};

/// Lifecycle of a peripheral session.  Every state other than `Uninitialized` and `Active` is
/// terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PeripheralState {
  Uninitialized,
  PermissionCheckFailed,
  RadioDisabled,
  ServerError,

  /// The GATT server was opened but advertising was refused; the server has been closed
  /// again.
  AdvertisingFailed,

  Active,
  Stopped,
}

impl PeripheralState {
  pub fn is_terminal(self) -> bool {
    !matches!(self, PeripheralState::Uninitialized | PeripheralState::Active)
  }
}

/// Heart rate peripheral: publishes the heart rate service through a [BleAdapterGateway],
/// advertises it, and answers reads of the measurement characteristic.
///
/// All methods are expected to be called from a single event stream: the owner calls
/// [PeripheralController::initialize] once, then feeds every [GattServerEvent] received on
/// the channel paired with `events` into [GattServerCallback::on_event].  Dropping the
/// controller shuts the session down.
pub struct PeripheralController<G: BleAdapterGateway, S: HeartRateSource = RandomHeartRate> {
  gateway: G,
  events: EventSender,
  config: PeripheralConfig,
  source: S,
  state: PeripheralState,
  service: Option<GattService>,
  server: Option<G::ServerHandle>,
  advertiser: Option<G::AdvertisingHandle>,
  is_advertising: bool,
  connected: BTreeSet<BluetoothAddress>,
}

impl<G: BleAdapterGateway> PeripheralController<G, RandomHeartRate> {
  pub fn new(gateway: G, events: EventSender, config: PeripheralConfig) -> Self {
    Self::with_source(gateway, events, config, RandomHeartRate::new())
  }
}

impl<G: BleAdapterGateway, S: HeartRateSource> PeripheralController<G, S> {
  pub fn with_source(gateway: G, events: EventSender, config: PeripheralConfig, source: S) -> Self {
    Self {
      gateway,
      events,
      config,
      source,
      state: PeripheralState::Uninitialized,
      service: None,
      server: None,
      advertiser: None,
      is_advertising: false,
      connected: BTreeSet::new(),
    }
  }

  pub fn state(&self) -> PeripheralState {
    self.state
  }

  pub fn config(&self) -> &PeripheralConfig {
    &self.config
  }

  pub fn gateway(&self) -> &G {
    &self.gateway
  }

  /// The registered service tree, present while the session is active.
  pub fn service(&self) -> Option<&GattService> {
    self.service.as_ref()
  }

  /// Whether the platform last reported advertising as running.
  pub fn is_advertising(&self) -> bool {
    self.is_advertising
  }

  pub fn connected_devices(&self) -> impl Iterator<Item = &BluetoothAddress> {
    self.connected.iter()
  }

  pub fn is_connected(&self, device: &BluetoothAddress) -> bool {
    self.connected.contains(device)
  }

  /// Bring the peripheral up: check permissions and radio, register the service, start
  /// advertising.  Either all of it succeeds and the session becomes `Active`, or nothing
  /// stays registered and the session ends in the matching failure state.
  ///
  /// Calling this again on an active session is a no-op.
  pub fn initialize(&mut self) -> Result<(), PeripheralError> {
    match self.state {
      PeripheralState::Active => {
        debug!("Already active, ignoring initialize");
        return Ok(());
      }
      state if state.is_terminal() => return Err(PeripheralError::InvalidState(state)),
      _ => {}
    }

    match self.start_session() {
      Ok(()) => {
        self.transition(PeripheralState::Active);
        Ok(())
      }
      Err(e) => {
        let next = match &e {
          PeripheralError::PermissionDenied => PeripheralState::PermissionCheckFailed,
          PeripheralError::RadioUnavailable => PeripheralState::RadioDisabled,
          PeripheralError::ServerRegistrationFailed(_) => PeripheralState::ServerError,
          PeripheralError::AdvertisingRejected(_) => PeripheralState::AdvertisingFailed,
          PeripheralError::InvalidState(state) => *state,
        };
        match e.platform_code() {
          Some(code) => error!("Peripheral failed to start: {e} (platform code {code})"),
          None => error!("Peripheral failed to start: {e}"),
        }
        self.transition(next);
        Err(e)
      }
    }
  }

  fn start_session(&mut self) -> Result<(), PeripheralError> {
    if !self.gateway.has_required_permissions() {
      return Err(PeripheralError::PermissionDenied);
    }
    if !self.gateway.is_radio_enabled() {
      return Err(PeripheralError::RadioUnavailable);
    }

    if let Some(name) = &self.config.device_name {
      if let Err(e) = self.gateway.set_device_name(name) {
        warn!("Could not set device name to {name:?}: {e}");
      }
    }

    let service = heart_rate_service();
    let advertising = self.config.advertising();

    let mut server = self
      .gateway
      .open_gatt_server(&service, self.events.clone())
      .map_err(PeripheralError::ServerRegistrationFailed)?;
    info!("GATT server registered with service {}", service.uuid);

    let advertiser = {
      let rollback = ServerRollback::new(&mut self.gateway, &mut server);
      let advertiser = rollback
        .gateway
        .start_advertising(&advertising, self.events.clone())
        .map_err(PeripheralError::AdvertisingRejected)?;
      rollback.disarm();
      advertiser
    };
    debug!("Advertising requested: {advertising:?}");

    self.service = Some(service);
    self.server = Some(server);
    self.advertiser = Some(advertiser);
    Ok(())
  }

  /// Close the server and stop advertising.  Safe to call any number of times, in any state.
  pub fn shutdown(&mut self) {
    if self.state == PeripheralState::Stopped {
      return;
    }

    if let Some(mut server) = self.server.take() {
      self.gateway.close_gatt_server(&mut server);
    }
    if let Some(mut advertiser) = self.advertiser.take() {
      self.gateway.stop_advertising(&mut advertiser);
    }
    self.service = None;
    self.is_advertising = false;
    self.connected.clear();
    self.transition(PeripheralState::Stopped);
  }

  pub fn on_connection_state_changed(&mut self, device: BluetoothAddress, state: ConnectionState) {
    match state {
      ConnectionState::Connected => {
        info!("Device connected: {device}");
        self.connected.insert(device);
      }
      ConnectionState::Disconnected => {
        info!("Device disconnected: {device}");
        self.connected.remove(&device);
      }
    }
  }

  pub fn on_advertising_started(&mut self) {
    info!("Advertising started");
    self.is_advertising = true;
  }

  /// Advertising failures after the session is up are only reported; the GATT server stays
  /// registered.
  pub fn on_advertising_failed(&mut self, reason: AdvertiseFailure) {
    error!("Advertising failed: {reason}");
    self.is_advertising = false;
  }

  pub fn on_subscription_changed(&mut self, device: BluetoothAddress, subscribed: bool) {
    debug!("Device {device} subscribed={subscribed}; measurements are served by read only");
  }

  /// Answer a read of the heart rate measurement with a fresh sample.  Reads made without
  /// permission, for another characteristic, or outside an active session get no response at
  /// all.
  pub fn on_characteristic_read_request(&mut self, request: ReadRequest) {
    if self.state != PeripheralState::Active {
      debug!("Dropping read {} from {}: peripheral is {:?}", request.request_id, request.device, self.state);
      return;
    }
    if !self.gateway.has_required_permissions() {
      warn!("Dropping read {} from {}: permission revoked", request.request_id, request.device);
      return;
    }
    if request.characteristic != HEART_RATE_MEASUREMENT_UUID {
      warn!(
        "Dropping read {} from {}: unknown characteristic {}",
        request.request_id, request.device, request.characteristic
      );
      return;
    }

    let value = HeartRateMeasurement::new(self.source.next_bpm()).to_bytes();
    let response = value
      .get(usize::from(request.offset)..)
      .map(|tail| Response::new(request.offset, tail))
      .ok_or(AttError::InvalidOffset);
    debug!("Read {} from {}: {response:?}", request.request_id, request.device);

    if let Err(e) = self.gateway.send_response(&request, response) {
      error!("Failed to respond to read {}: {e}", request.request_id);
    }
  }

  fn transition(&mut self, next: PeripheralState) {
    info!("Peripheral {:?} -> {:?}", self.state, next);
    self.state = next;
  }
}

impl<G: BleAdapterGateway, S: HeartRateSource> GattServerCallback for PeripheralController<G, S> {
  fn on_event(&mut self, event: GattServerEvent) {
    trace!("event: {event:?}");
    match event {
      GattServerEvent::AdvertisingStarted => self.on_advertising_started(),
      GattServerEvent::AdvertisingStartFailed { reason } => self.on_advertising_failed(reason),
      GattServerEvent::ConnectionStateChanged { device, state } => {
        self.on_connection_state_changed(device, state)
      }
      GattServerEvent::ReadRequest(request) => self.on_characteristic_read_request(request),
      GattServerEvent::SubscriptionChanged { device, subscribed } => {
        self.on_subscription_changed(device, subscribed)
      }
    }
  }
}

impl<G: BleAdapterGateway, S: HeartRateSource> Drop for PeripheralController<G, S> {
  fn drop(&mut self) {
    self.shutdown();
  }
}

/// Closes a freshly opened server unless disarmed, so a failure to advertise never leaves an
/// unreachable server registered.
struct ServerRollback<'a, G: BleAdapterGateway> {
  gateway: &'a mut G,
  server: &'a mut G::ServerHandle,
  armed: bool,
}

impl<'a, G: BleAdapterGateway> ServerRollback<'a, G> {
  fn new(gateway: &'a mut G, server: &'a mut G::ServerHandle) -> Self {
    Self {
      gateway,
      server,
      armed: true,
    }
  }

  fn disarm(mut self) {
    self.armed = false;
  }
}

impl<G: BleAdapterGateway> Drop for ServerRollback<'_, G> {
  fn drop(&mut self) {
    if self.armed {
      warn!("Rolling back GATT server registration");
      self.gateway.close_gatt_server(self.server);
    }
  }
}
