use tokio::sync::mpsc;

use crate::bluetooth_address::BluetoothAddress;
use crate::gap_advertiser::AdvertiseFailure;
use crate::gatt_connection::{ConnectionState, ReadRequest};

/// Receiver of everything the platform reports about a running GATT server and its
/// advertiser.  Events are delivered one at a time, in the order the platform produced
/// them.
pub trait GattServerCallback {
  fn on_event(&mut self, event: GattServerEvent);
}

impl<F> GattServerCallback for F
where
  F: FnMut(GattServerEvent),
{
  fn on_event(&mut self, event: GattServerEvent) {
    (self)(event)
  }
}

/// Platform callbacks may fire on any thread; they push into this channel and the owner of
/// the callback drains it on its own event stream.
pub type EventSender = mpsc::UnboundedSender<GattServerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<GattServerEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
  mpsc::unbounded_channel()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattServerEvent {
  /// Advertising has started.  New connections will now be accepted.  May arrive before or
  /// after the call that requested it returns.
  AdvertisingStarted,

  /// Advertising could not be started, or stopped unexpectedly after it was started.
  AdvertisingStartFailed { reason: AdvertiseFailure },

  /// A central connected or disconnected.
  ConnectionStateChanged {
    device: BluetoothAddress,
    state: ConnectionState,
  },

  /// Issue a read request for a characteristic.  The response (if any) must be sent before
  /// the callback returns; there is no deferred response path.
  ReadRequest(ReadRequest),

  /// A central enabled or disabled notifications on a characteristic.
  SubscriptionChanged {
    device: BluetoothAddress,
    subscribed: bool,
  },
}

/// Drain every event already queued on `events` into `callback` without waiting for more.
/// Returns the number of events delivered.
pub fn dispatch_pending(events: &mut EventReceiver, callback: &mut impl GattServerCallback) -> usize {
  let mut delivered = 0;
  while let Ok(event) = events.try_recv() {
    callback.on_event(event);
    delivered += 1;
  }
  delivered
}
