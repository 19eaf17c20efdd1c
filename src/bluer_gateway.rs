//! [BleAdapterGateway] backed by BlueZ through `bluer`.

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bluer::adv::{Advertisement, AdvertisementHandle, Type};
use bluer::gatt::local::{
  Application, ApplicationHandle, Characteristic, CharacteristicNotifier, CharacteristicNotify,
  CharacteristicNotifyFun, CharacteristicNotifyMethod, CharacteristicRead, CharacteristicReadRequest,
  ReqError, ReqResult, Service,
};
use bluer::{
  Adapter, AdapterEvent, Address, AddressType, DeviceEvent, DeviceProperty, ErrorKind, Uuid,
};
use futures_util::stream::SelectAll;
use futures_util::{FutureExt, Stream, StreamExt};
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::att_error::AttError;
use crate::bluetooth_address::BluetoothAddress;
use crate::descriptors::{GattCharacteristic, GattService, GattServiceType, UUID};
use crate::error::GatewayError;
use crate::gap_advertiser::{AdvertiseFailure, AdvertisingConfig};
use crate::gateway::BleAdapterGateway;
use crate::gatt_connection::{ConnectionState, ReadRequest, RequestId, Response};
use crate::gatt_server_cb::{EventSender, GattServerEvent};

/// A central gives up on an ATT request after 30 seconds; a read still unanswered by then
/// can never be delivered.
const ATT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(30);

const NOTIFY_SESSION_POLL: Duration = Duration::from_secs(1);

/// Gateway over a BlueZ adapter.
///
/// BlueZ is asynchronous; every gateway call blocks the calling thread on `runtime` until
/// the D-Bus round trip finishes, so calls must come from a multi-threaded tokio runtime (or
/// from a thread outside of any runtime).
pub struct BluerGateway {
  adapter: Adapter,
  runtime: Handle,
  pending: Arc<PendingReads>,
}

impl BluerGateway {
  /// `adapter` is the process-wide handle to the radio; clones of it share the same adapter.
  pub fn new(adapter: Adapter, runtime: Handle) -> Self {
    Self {
      adapter,
      runtime,
      pending: Arc::new(PendingReads::default()),
    }
  }

  fn block_on<F: Future>(&self, future: F) -> F::Output {
    tokio::task::block_in_place(|| self.runtime.block_on(future))
  }

  fn new_service(&self, spec: &GattService, events: &EventSender) -> Service {
    Service {
      uuid: Uuid::from(spec.uuid),
      primary: spec.service_type == GattServiceType::Primary,
      characteristics: spec
        .characteristics
        .iter()
        .map(|c| self.new_characteristic(c, events))
        .collect(),
      ..Default::default()
    }
  }

  fn new_characteristic(&self, spec: &GattCharacteristic, events: &EventSender) -> Characteristic {
    let read = spec.is_readable().then(|| CharacteristicRead {
      read: true,
      fun: new_read_handler(spec.uuid, self.pending.clone(), events.clone()),
      ..Default::default()
    });
    let notify = spec.is_subscribable().then(|| CharacteristicNotify {
      notify: true,
      method: CharacteristicNotifyMethod::Fun(new_notify_handler(events.clone())),
      ..Default::default()
    });

    Characteristic {
      uuid: Uuid::from(spec.uuid),
      read,
      notify,
      ..Default::default()
    }
  }
}

impl Debug for BluerGateway {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BluerGateway")
      .field("adapter", &self.adapter.name())
      .finish_non_exhaustive()
  }
}

impl BleAdapterGateway for BluerGateway {
  type ServerHandle = BluerServer;
  type AdvertisingHandle = BluerAdvertisement;

  fn is_radio_enabled(&self) -> bool {
    self.block_on(self.adapter.is_powered()).unwrap_or_else(|e| {
      warn!("Could not query adapter {}: {e}", self.adapter.name());
      false
    })
  }

  /// BlueZ has no up-front permission grant; access is decided by D-Bus policy when the
  /// application or advertisement is registered, and a refusal surfaces from those calls.
  fn has_required_permissions(&self) -> bool {
    true
  }

  fn set_device_name(&mut self, name: &str) -> Result<(), GatewayError> {
    self
      .block_on(self.adapter.set_alias(name.to_owned()))
      .map_err(GatewayError::platform)
  }

  fn open_gatt_server(
    &mut self,
    service: &GattService,
    events: EventSender,
  ) -> Result<Self::ServerHandle, GatewayError> {
    let app = Application {
      services: vec![self.new_service(service, &events)],
      ..Default::default()
    };
    let app = self
      .block_on(self.adapter.serve_gatt_application(app))
      .map_err(server_error)?;

    let adapter = self.adapter.clone();
    let monitor = self.runtime.spawn(async move {
      if let Err(e) = monitor_connections(adapter, events).await {
        warn!("Connection monitor stopped: {e}");
      }
    });

    Ok(BluerServer {
      app: Some(app),
      monitor: Some(monitor),
    })
  }

  fn close_gatt_server(&mut self, server: &mut Self::ServerHandle) {
    let _enter = self.runtime.enter();
    if let Some(monitor) = server.monitor.take() {
      monitor.abort();
    }
    if let Some(app) = server.app.take() {
      drop(app);
      self.pending.clear();
      info!("GATT application unregistered");
    }
  }

  fn start_advertising(
    &mut self,
    config: &AdvertisingConfig,
    events: EventSender,
  ) -> Result<Self::AdvertisingHandle, GatewayError> {
    let name = if config.include_device_name {
      self.block_on(self.adapter.alias()).ok()
    } else {
      None
    };

    // BlueZ assembles the PDU itself but rejects one that overflows, so pick the name that
    // fits next to the service UUIDs up front.
    let payload = config
      .payload(name.as_deref())
      .map_err(|_| GatewayError::PlatformRejected(AdvertiseFailure::DataTooLarge))?;
    debug!("Advertising PDU: {:02x?}", &payload[..]);

    let adv = Advertisement {
      advertisement_type: if config.is_connectable {
        Type::Peripheral
      } else {
        Type::Broadcast
      },
      service_uuids: config.service_uuids.iter().map(|u| Uuid::from(*u)).collect(),
      local_name: payload.local_name().map(str::to_owned),
      discoverable: Some(true),
      min_interval: Some(config.mode.interval()),
      max_interval: Some(config.mode.interval()),
      tx_power: Some(config.tx_power.dbm()),
      ..Default::default()
    };

    let handle = self
      .block_on(self.adapter.advertise(adv))
      .map_err(advertise_error)?;
    let _ = events.send(GattServerEvent::AdvertisingStarted);

    Ok(BluerAdvertisement {
      handle: Some(handle),
    })
  }

  fn stop_advertising(&mut self, advertiser: &mut Self::AdvertisingHandle) {
    let _enter = self.runtime.enter();
    if let Some(handle) = advertiser.handle.take() {
      drop(handle);
      info!("Advertising stopped");
    }
  }

  fn send_response(
    &mut self,
    request: &ReadRequest,
    response: Result<Response<'_>, AttError>,
  ) -> Result<(), GatewayError> {
    let reply = response.map(|r| r.value.to_vec());
    self
      .pending
      .take(request.request_id)
      .ok_or_else(|| generic_err(format!("no pending read {}", request.request_id)))?
      .send(reply)
      .map_err(|_| generic_err(format!("read {} already abandoned", request.request_id)))
  }
}

/// Keeps the GATT application registered and the connection monitor running.
pub struct BluerServer {
  app: Option<ApplicationHandle>,
  monitor: Option<JoinHandle<()>>,
}

impl Debug for BluerServer {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BluerServer")
      .field("open", &self.app.is_some())
      .finish_non_exhaustive()
  }
}

pub struct BluerAdvertisement {
  handle: Option<AdvertisementHandle>,
}

impl Debug for BluerAdvertisement {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BluerAdvertisement")
      .field("active", &self.handle.is_some())
      .finish()
  }
}

type ReadReply = Result<Vec<u8>, AttError>;

type ReadFun = Box<
  dyn (Fn(CharacteristicReadRequest) -> Pin<Box<dyn Future<Output = ReqResult<Vec<u8>>> + Send>>)
    + Send
    + Sync,
>;

/// Read requests handed to the controller and waiting for its answer, by request id.
#[derive(Default)]
struct PendingReads {
  next_id: AtomicU32,
  waiting: Mutex<HashMap<RequestId, oneshot::Sender<ReadReply>>>,
}

impl PendingReads {
  fn register(&self) -> (RequestId, oneshot::Receiver<ReadReply>) {
    let request_id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
    let (tx, rx) = oneshot::channel();
    self.lock().insert(request_id, tx);
    (request_id, rx)
  }

  fn take(&self, request_id: RequestId) -> Option<oneshot::Sender<ReadReply>> {
    self.lock().remove(&request_id)
  }

  fn clear(&self) {
    self.lock().clear();
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<ReadReply>>> {
    self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

fn new_read_handler(characteristic: UUID, pending: Arc<PendingReads>, events: EventSender) -> ReadFun {
  Box::new(move |req: CharacteristicReadRequest| {
    let pending = pending.clone();
    let events = events.clone();
    async move {
      let (request_id, reply) = pending.register();
      let request = ReadRequest {
        device: BluetoothAddress(req.device_address.0),
        request_id,
        offset: req.offset,
        characteristic,
      };
      if events.send(GattServerEvent::ReadRequest(request)).is_err() {
        pending.take(request_id);
        return Err(ReqError::Failed);
      }

      match tokio::time::timeout(ATT_TRANSACTION_TIMEOUT, reply).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(att_to_req_error(e)),
        Ok(Err(_)) => Err(ReqError::Failed),
        Err(_) => {
          pending.take(request_id);
          debug!("Read {request_id} was never answered");
          Err(ReqError::Failed)
        }
      }
    }
    .boxed()
  })
}

fn new_notify_handler(events: EventSender) -> CharacteristicNotifyFun {
  Box::new(move |notifier: CharacteristicNotifier| {
    let events = events.clone();
    async move {
      // bluer does not expose which peer opened a notify session.
      let device = BluetoothAddress::any();
      if events
        .send(GattServerEvent::SubscriptionChanged { device, subscribed: true })
        .is_err()
      {
        return;
      }
      tokio::spawn(hold_notify_session(notifier, device, events));
    }
    .boxed()
  })
}

async fn hold_notify_session(
  notifier: CharacteristicNotifier,
  device: BluetoothAddress,
  events: EventSender,
) {
  while !notifier.is_stopped() {
    tokio::time::sleep(NOTIFY_SESSION_POLL).await;
  }
  let _ = events.send(GattServerEvent::SubscriptionChanged { device, subscribed: false });
}

type DeviceEvents = Pin<Box<dyn Stream<Item = (Address, DeviceEvent)> + Send>>;

/// Turn BlueZ device `Connected` property changes into connection events until the event
/// receiver goes away.  Only LE devices are followed; a central reaching the GATT server
/// always connects over LE, while classic peers of the host (keyboards, headsets) do not.
async fn monitor_connections(adapter: Adapter, events: EventSender) -> bluer::Result<()> {
  let adapter_events = adapter.events().await?;
  futures_util::pin_mut!(adapter_events);

  let mut watched = HashSet::new();
  let mut devices: SelectAll<DeviceEvents> = SelectAll::new();
  for address in adapter.device_addresses().await? {
    watch_device(&adapter, address, &mut watched, &mut devices).await;
  }

  loop {
    tokio::select! {
      Some(event) = adapter_events.next() => match event {
        AdapterEvent::DeviceAdded(address) => {
          watch_device(&adapter, address, &mut watched, &mut devices).await;
        }
        AdapterEvent::DeviceRemoved(address) => {
          watched.remove(&address);
        }
        _ => {}
      },
      Some((address, event)) = devices.next(), if !devices.is_empty() => {
        if let Some(event) = connection_event(address, &event) {
          if events.send(event).is_err() {
            return Ok(());
          }
        }
      }
      else => return Ok(()),
    }
  }
}

async fn watch_device(
  adapter: &Adapter,
  address: Address,
  watched: &mut HashSet<Address>,
  devices: &mut SelectAll<DeviceEvents>,
) {
  if watched.contains(&address) {
    return;
  }
  let device = match adapter.device(address) {
    Ok(device) => device,
    Err(e) => {
      debug!("Cannot watch {address}: {e}");
      return;
    }
  };
  match device.address_type().await {
    Ok(address_type) if is_le(address_type) => {}
    Ok(_) => {
      debug!("Ignoring classic device {address}");
      return;
    }
    Err(e) => {
      debug!("Cannot watch {address}: {e}");
      return;
    }
  }
  match device.events().await {
    Ok(stream) => {
      watched.insert(address);
      devices.push(stream.map(move |event| (address, event)).boxed());
    }
    Err(e) => debug!("Cannot watch {address}: {e}"),
  }
}

fn is_le(address_type: AddressType) -> bool {
  !matches!(address_type, AddressType::BrEdr)
}

fn connection_event(address: Address, event: &DeviceEvent) -> Option<GattServerEvent> {
  let connected = match event {
    DeviceEvent::PropertyChanged(DeviceProperty::Connected(connected)) => *connected,
    _ => return None,
  };
  let state = if connected {
    ConnectionState::Connected
  } else {
    ConnectionState::Disconnected
  };
  Some(GattServerEvent::ConnectionStateChanged {
    device: BluetoothAddress(address.0),
    state,
  })
}

fn server_error(e: bluer::Error) -> GatewayError {
  match e.kind {
    ErrorKind::NotPermitted | ErrorKind::NotAuthorized => GatewayError::PermissionDenied,
    ErrorKind::NotReady | ErrorKind::NotAvailable => GatewayError::RadioUnavailable,
    _ => GatewayError::platform(e),
  }
}

fn advertise_error(e: bluer::Error) -> GatewayError {
  match e.kind {
    ErrorKind::NotPermitted | ErrorKind::NotAuthorized => GatewayError::PermissionDenied,
    ErrorKind::AlreadyExists => GatewayError::AlreadyAdvertising,
    ErrorKind::InvalidLength => GatewayError::PlatformRejected(AdvertiseFailure::DataTooLarge),
    ErrorKind::NotSupported => GatewayError::PlatformRejected(AdvertiseFailure::FeatureUnsupported),
    ErrorKind::Failed if e.message.contains("Maximum advertisements") => {
      GatewayError::PlatformRejected(AdvertiseFailure::TooManyAdvertisers)
    }
    _ => {
      warn!("Advertising refused by BlueZ: {e}");
      GatewayError::PlatformRejected(AdvertiseFailure::InternalError)
    }
  }
}

fn att_to_req_error(e: AttError) -> ReqError {
  match e {
    AttError::ReadNotPermitted | AttError::WriteNotPermitted => ReqError::NotPermitted,
    AttError::InvalidPdu | AttError::RequestNotSupported => ReqError::NotSupported,
    AttError::InsufficientAuthentication | AttError::InsufficientAuthorization => {
      ReqError::NotAuthorized
    }
    AttError::InvalidOffset => ReqError::InvalidOffset,
    AttError::InvalidAttributeValueLength => ReqError::InvalidValueLength,
    _ => ReqError::Failed,
  }
}

fn generic_err(debug_message: String) -> GatewayError {
  GatewayError::platform(std::io::Error::new(std::io::ErrorKind::Other, debug_message))
}
