//! Descriptors just define the structure and data types of services/characteristics.  These
//! are pure data types and do not have functional APIs.
pub mod gatt_characteristic;
pub mod gatt_service;
pub mod uuid;

pub use self::gatt_characteristic::*;
pub use self::gatt_service::*;
pub use self::uuid::*;
