//! PicoFCM BLE Controller
//!
//! BLE client for provisioning and managing PicoFCM devices.
//!
//! # Example
//!
//! ```ignore
//! use picofcm_ble_controller::ble;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), picofcm_ble_controller::ControllerError> {
//!     // Scan for devices
//!     let devices = ble::scan(5).await?;
//!     for device in &devices {
//!         println!("{} ({})", device.name, device.address);
//!     }
//!
//!     // Store a network and the notification endpoint, then connect
//!     let endpoint = ble::Endpoint { url: "https://push.example.com/send", token: "abc" };
//!     ble::save_network(None, "MySSID", "MyPassword", Some(&endpoint)).await?;
//!     ble::connect_stored(None).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod ble;
mod error;

pub use error::ControllerError;
