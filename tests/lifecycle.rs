mod common;

use common::*;
use heart_rate_peripheral::prelude::*;

#[test]
fn permission_denied_touches_nothing() {
  let (gateway, mut controller, _rx) = controller();
  gateway.radio().permissions_granted = false;

  let err = controller.initialize().unwrap_err();
  assert!(matches!(err, PeripheralError::PermissionDenied));
  assert_eq!(controller.state(), PeripheralState::PermissionCheckFailed);

  let radio = gateway.radio();
  assert_eq!(radio.open_calls, 0);
  assert_eq!(radio.advertise_calls, 0);
  assert_eq!(radio.device_name, None);
}

#[test]
fn radio_disabled_never_opens_server() {
  let (gateway, mut controller, _rx) = controller();
  gateway.radio().radio_enabled = false;

  let err = controller.initialize().unwrap_err();
  assert!(matches!(err, PeripheralError::RadioUnavailable));
  assert_eq!(controller.state(), PeripheralState::RadioDisabled);
  assert_eq!(gateway.radio().open_calls, 0);
  assert_eq!(gateway.radio().advertise_calls, 0);
}

#[test]
fn server_failure_never_advertises() {
  let (gateway, mut controller, _rx) = controller();
  gateway.radio().open_error = Some(|| GatewayError::RadioUnavailable);

  let err = controller.initialize().unwrap_err();
  assert!(matches!(err, PeripheralError::ServerRegistrationFailed(GatewayError::RadioUnavailable)));
  assert_eq!(controller.state(), PeripheralState::ServerError);
  assert_eq!(gateway.radio().advertise_calls, 0);
}

#[test]
fn permission_revoked_before_open_is_server_error() {
  let (gateway, mut controller, _rx) = controller();
  gateway.radio().revoke_permissions_on_open = true;

  let err = controller.initialize().unwrap_err();
  assert!(matches!(err, PeripheralError::ServerRegistrationFailed(GatewayError::PermissionDenied)));
  assert_eq!(controller.state(), PeripheralState::ServerError);

  let radio = gateway.radio();
  assert_eq!(radio.open_calls, 1);
  assert_eq!(radio.advertise_calls, 0);
  assert!(!radio.is_server_open());
}

#[test]
fn advertising_rejection_rolls_back_server() {
  let (gateway, mut controller, _rx) = controller();
  gateway.radio().advertise_error =
    Some(|| GatewayError::PlatformRejected(AdvertiseFailure::TooManyAdvertisers));

  let err = controller.initialize().unwrap_err();
  assert_eq!(err.platform_code(), Some(2));
  assert_eq!(controller.state(), PeripheralState::AdvertisingFailed);

  let radio = gateway.radio();
  assert_eq!(radio.open_calls, 1);
  assert_eq!(radio.server_closes, 1);
  assert!(!radio.is_server_open());
  assert!(controller.service().is_none());
}

#[test]
fn already_advertising_reports_code_three() {
  let (gateway, mut controller, _rx) = controller();
  gateway.radio().advertise_error = Some(|| GatewayError::AlreadyAdvertising);

  let err = controller.initialize().unwrap_err();
  assert_eq!(err.platform_code(), Some(3));
  assert!(!gateway.radio().is_server_open());
}

#[test]
fn success_registers_heart_rate_service_once() {
  let (gateway, mut controller, mut rx) = controller();

  controller.initialize().unwrap();
  assert_eq!(controller.state(), PeripheralState::Active);

  {
    let radio = gateway.radio();
    assert_eq!(radio.open_calls, 1);
    assert_eq!(radio.registered.len(), 1);
    let service = &radio.registered[0];
    assert_eq!(service.uuid.to_string(), "0000180d-0000-1000-8000-00805f9b34fb");
    assert_eq!(service.service_type, GattServiceType::Primary);
    assert_eq!(service.characteristics.len(), 1);
    assert_eq!(
      service.characteristics[0].uuid.to_string(),
      "00002a37-0000-1000-8000-00805f9b34fb"
    );
    assert_eq!(controller.service(), Some(service));
  }

  controller.initialize().unwrap();
  assert_eq!(controller.state(), PeripheralState::Active);
  assert_eq!(gateway.radio().open_calls, 1);
  assert_eq!(gateway.radio().advertise_calls, 1);

  assert!(!controller.is_advertising());
  assert_eq!(dispatch_pending(&mut rx, &mut controller), 1);
  assert!(controller.is_advertising());
}

#[test]
fn advertises_connectable_heart_rate_uuid() {
  let (gateway, mut controller, _rx) = controller();
  controller.initialize().unwrap();

  let radio = gateway.radio();
  let config = &radio.advertised[0];
  assert!(config.is_connectable);
  assert!(config.include_device_name);
  assert_eq!(config.mode, AdvertiseMode::LowLatency);
  assert_eq!(config.tx_power, TxPowerLevel::High);
  assert_eq!(config.service_uuids, vec![HEART_RATE_SERVICE_UUID]);
}

#[test]
fn configured_name_is_applied() {
  let gateway = FakeGateway::new();
  let (tx, _rx) = event_channel();
  let config = PeripheralConfig {
    device_name: Some("Pulse".to_string()),
    ..Default::default()
  };
  let mut controller = PeripheralController::new(gateway.clone(), tx, config);
  controller.initialize().unwrap();
  assert_eq!(gateway.radio().device_name.as_deref(), Some("Pulse"));
}

#[test]
fn failed_session_cannot_be_restarted() {
  let (gateway, mut controller, _rx) = controller();
  gateway.radio().radio_enabled = false;
  controller.initialize().unwrap_err();

  gateway.radio().radio_enabled = true;
  let err = controller.initialize().unwrap_err();
  assert!(matches!(err, PeripheralError::InvalidState(PeripheralState::RadioDisabled)));
  assert_eq!(gateway.radio().open_calls, 0);
}

#[test]
fn shutdown_is_idempotent() {
  let (gateway, mut controller, _rx) = controller();
  controller.initialize().unwrap();

  controller.shutdown();
  controller.shutdown();
  assert_eq!(controller.state(), PeripheralState::Stopped);

  let radio = gateway.radio();
  assert_eq!(radio.server_closes, 1);
  assert_eq!(radio.advertiser_stops, 1);
  assert!(!radio.is_server_open());
}

#[test]
fn shutdown_without_initialize() {
  let (gateway, mut controller, _rx) = controller();
  controller.shutdown();
  controller.shutdown();
  assert_eq!(controller.state(), PeripheralState::Stopped);
  assert_eq!(gateway.radio().server_closes, 0);
  assert_eq!(gateway.radio().advertiser_stops, 0);

  let err = controller.initialize().unwrap_err();
  assert!(matches!(err, PeripheralError::InvalidState(PeripheralState::Stopped)));
}

#[test]
fn drop_shuts_down() {
  let (gateway, mut controller, _rx) = controller();
  controller.initialize().unwrap();
  drop(controller);

  let radio = gateway.radio();
  assert_eq!(radio.server_closes, 1);
  assert_eq!(radio.advertiser_stops, 1);
}

#[test]
fn connection_table_tracks_events() {
  let (_gateway, mut controller, _rx) = controller();
  controller.initialize().unwrap();

  let a: BluetoothAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
  let b: BluetoothAddress = "11:22:33:44:55:66".parse().unwrap();
  controller.on_event(GattServerEvent::ConnectionStateChanged {
    device: a,
    state: ConnectionState::Connected,
  });
  controller.on_event(GattServerEvent::ConnectionStateChanged {
    device: b,
    state: ConnectionState::Connected,
  });
  controller.on_event(GattServerEvent::ConnectionStateChanged {
    device: a,
    state: ConnectionState::Disconnected,
  });

  assert!(!controller.is_connected(&a));
  assert!(controller.is_connected(&b));
  assert_eq!(controller.connected_devices().copied().collect::<Vec<_>>(), vec![b]);

  controller.shutdown();
  assert_eq!(controller.connected_devices().count(), 0);
}

#[test]
fn late_advertising_failure_keeps_server() {
  let (gateway, mut controller, mut rx) = controller();
  controller.initialize().unwrap();
  dispatch_pending(&mut rx, &mut controller);

  controller.on_event(GattServerEvent::AdvertisingStartFailed {
    reason: AdvertiseFailure::InternalError,
  });
  assert!(!controller.is_advertising());
  assert_eq!(controller.state(), PeripheralState::Active);
  assert!(gateway.radio().is_server_open());
}
