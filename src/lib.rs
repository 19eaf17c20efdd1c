pub mod advertisement;
pub mod att_error;
pub mod bluetooth_address;
pub mod config;
pub mod controller;
pub mod descriptors;
pub mod error;
pub mod gap_advertiser;
pub mod gateway;
pub mod gatt_connection;
pub mod gatt_server_cb;
pub mod heart_rate;

#[cfg(feature = "bluez")]
pub mod bluer_gateway;

pub mod prelude {
  pub use crate::advertisement::*;
  pub use crate::att_error::*;
  pub use crate::bluetooth_address::*;
  pub use crate::config::*;
  pub use crate::controller::*;
  pub use crate::descriptors::*;
  pub use crate::error::*;
  pub use crate::gap_advertiser::*;
  pub use crate::gateway::*;
  pub use crate::gatt_connection::*;
  pub use crate::gatt_server_cb::*;
  pub use crate::heart_rate::*;
}
