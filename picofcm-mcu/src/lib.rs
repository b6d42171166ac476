//! PicoFCM MCU Library
//!
//! Provisioning core for headless devices: WiFi credentials and a push
//! notification endpoint are written over BLE, stored durably, and used to
//! bring the device online and send notifications.
//!
//! This crate provides:
//! - Traits for the WiFi, BLE, storage, HTTP and clock collaborators
//! - A bounded credential store with its persisted JSON record
//! - The provisioning state machine and its connection timeout
//! - The BLE command interpreter and field staging buffers
//! - The notification sender
//!
//! Everything is owned by a [`Provisioner`], driven by calling
//! [`Provisioner::handle_event`] from the transport and [`Provisioner::tick`]
//! from the main loop. Nothing here spawns threads or blocks on its own.

pub mod ble;
pub mod bounded;
pub mod clock;
mod command;
pub mod credentials;
pub mod error;
pub mod http;
pub mod notify;
mod provisioner;
pub mod staging;
pub mod state;
pub mod storage;
pub mod wifi;

#[cfg(test)]
pub(crate) mod testing;

pub use ble::*;
pub use bounded::Bounded;
pub use clock::{Clock, MonotonicClock};
pub use credentials::{CredentialStore, NetworkCredential, NotificationEndpoint};
pub use error::{ConnectError, CredentialError, NotifyError, PersistenceError};
pub use http::{HttpClient, HttpResponse};
pub use provisioner::Provisioner;
pub use staging::StagingBuffers;
pub use state::{PollOutcome, ProvisioningStatus, StateMachine, CONNECT_TIMEOUT_MS};
pub use storage::*;
pub use wifi::*;
