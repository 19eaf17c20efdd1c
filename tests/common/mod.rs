#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use heart_rate_peripheral::prelude::*;

/// Everything the fake radio was asked to do, plus knobs controlling how it answers.
#[derive(Debug)]
pub struct FakeRadio {
  pub permissions_granted: bool,
  pub radio_enabled: bool,
  pub open_error: Option<fn() -> GatewayError>,
  pub advertise_error: Option<fn() -> GatewayError>,

  /// Permission checks still pass but are denied once the server is opened.
  pub revoke_permissions_on_open: bool,

  pub device_name: Option<String>,
  pub open_calls: usize,
  pub advertise_calls: usize,
  pub registered: Vec<GattService>,
  pub advertised: Vec<AdvertisingConfig>,
  pub server_closes: usize,
  pub advertiser_stops: usize,
  pub responses: Vec<SentResponse>,
}

impl Default for FakeRadio {
  fn default() -> Self {
    Self {
      permissions_granted: true,
      radio_enabled: true,
      open_error: None,
      advertise_error: None,
      revoke_permissions_on_open: false,
      device_name: None,
      open_calls: 0,
      advertise_calls: 0,
      registered: Vec::new(),
      advertised: Vec::new(),
      server_closes: 0,
      advertiser_stops: 0,
      responses: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentResponse {
  pub device: BluetoothAddress,
  pub request_id: RequestId,
  pub result: Result<(u16, Vec<u8>), AttError>,
}

impl FakeRadio {
  pub fn is_server_open(&self) -> bool {
    !self.registered.is_empty()
  }

  pub fn response_for(&self, request_id: RequestId) -> Option<&SentResponse> {
    self.responses.iter().find(|r| r.request_id == request_id)
  }
}

#[derive(Debug)]
pub struct FakeServer {
  open: bool,
}

#[derive(Debug)]
pub struct FakeAdvertiser {
  active: bool,
}

/// Gateway over a [FakeRadio] shared with the test, so the test can inspect and steer it
/// while the controller owns the gateway.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
  radio: Arc<Mutex<FakeRadio>>,
}

impl FakeGateway {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn radio(&self) -> MutexGuard<'_, FakeRadio> {
    self.radio.lock().unwrap()
  }
}

impl BleAdapterGateway for FakeGateway {
  type ServerHandle = FakeServer;
  type AdvertisingHandle = FakeAdvertiser;

  fn is_radio_enabled(&self) -> bool {
    self.radio().radio_enabled
  }

  fn has_required_permissions(&self) -> bool {
    self.radio().permissions_granted
  }

  fn set_device_name(&mut self, name: &str) -> Result<(), GatewayError> {
    self.radio().device_name = Some(name.to_owned());
    Ok(())
  }

  fn open_gatt_server(
    &mut self,
    service: &GattService,
    _events: EventSender,
  ) -> Result<FakeServer, GatewayError> {
    let mut radio = self.radio();
    radio.open_calls += 1;
    if radio.revoke_permissions_on_open {
      radio.permissions_granted = false;
    }
    if !radio.permissions_granted {
      return Err(GatewayError::PermissionDenied);
    }
    if let Some(error) = radio.open_error {
      return Err(error());
    }
    radio.registered.push(service.clone());
    Ok(FakeServer { open: true })
  }

  fn close_gatt_server(&mut self, server: &mut FakeServer) {
    if server.open {
      server.open = false;
      let mut radio = self.radio();
      radio.server_closes += 1;
      radio.registered.clear();
    }
  }

  fn start_advertising(
    &mut self,
    config: &AdvertisingConfig,
    events: EventSender,
  ) -> Result<FakeAdvertiser, GatewayError> {
    let mut radio = self.radio();
    radio.advertise_calls += 1;
    if let Some(error) = radio.advertise_error {
      return Err(error());
    }
    radio.advertised.push(config.clone());
    let _ = events.send(GattServerEvent::AdvertisingStarted);
    Ok(FakeAdvertiser { active: true })
  }

  fn stop_advertising(&mut self, advertiser: &mut FakeAdvertiser) {
    if advertiser.active {
      advertiser.active = false;
      self.radio().advertiser_stops += 1;
    }
  }

  fn send_response(
    &mut self,
    request: &ReadRequest,
    response: Result<Response<'_>, AttError>,
  ) -> Result<(), GatewayError> {
    self.radio().responses.push(SentResponse {
      device: request.device,
      request_id: request.request_id,
      result: response.map(|r| (r.offset, r.value.to_vec())),
    });
    Ok(())
  }
}

pub type TestController = PeripheralController<FakeGateway, Box<dyn FnMut() -> u8>>;

/// A controller over a fresh fake radio, with its event receiver.
pub fn controller() -> (FakeGateway, PeripheralController<FakeGateway>, EventReceiver) {
  let gateway = FakeGateway::new();
  let (tx, rx) = event_channel();
  let controller = PeripheralController::new(gateway.clone(), tx, PeripheralConfig::default());
  (gateway, controller, rx)
}

/// Like [controller], but every measurement reads `bpm`.
pub fn controller_with_bpm(bpm: u8) -> (FakeGateway, TestController, EventReceiver) {
  let gateway = FakeGateway::new();
  let (tx, rx) = event_channel();
  let source: Box<dyn FnMut() -> u8> = Box::new(move || bpm);
  let controller =
    PeripheralController::with_source(gateway.clone(), tx, PeripheralConfig::default(), source);
  (gateway, controller, rx)
}

pub fn read(device: &str, request_id: u32, offset: u16, characteristic: UUID) -> ReadRequest {
  ReadRequest {
    device: device.parse().unwrap(),
    request_id: RequestId(request_id),
    offset,
    characteristic,
  }
}
