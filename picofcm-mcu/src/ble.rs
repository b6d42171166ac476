//! BLE GATT transport types and traits for PicoFCM provisioning
//!
//! Protocol constants (UUIDs, commands) are in picofcm_proto.
//! This module provides the events a transport delivers to the core and the
//! primitives the core calls back into.

use std::fmt;

// Re-export protocol constants for convenience
pub use picofcm_proto::{
    commands, pairing, Characteristic, Command, PairingStatus, COMMAND_UUID, FCM_TOKEN_UUID,
    FCM_URL_UUID, PAIRING_STATUS_UUID, PASSWORD_UUID, SERVICE_UUID, SSID_UUID,
};

/// Connection handle of an associated BLE central
pub type PeerHandle = u16;

/// Event delivered by the BLE stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleEvent {
    /// A central connected successfully
    PeerConnected { peer: PeerHandle },
    /// A central tried to connect and the link setup failed
    PeerConnectFailed,
    /// The associated central went away
    PeerDisconnected,
    /// A characteristic value was written
    Write {
        characteristic: Characteristic,
        data: Vec<u8>,
    },
    /// A central enabled or disabled notifications on a characteristic
    SubscriptionChanged {
        characteristic: Characteristic,
        subscribed: bool,
    },
}

/// Trait for BLE GATT server implementations
///
/// MCU-specific crates implement this trait using their BLE stack.
pub trait BleTransport {
    /// Error type for BLE operations
    type Error: fmt::Debug;

    /// Start BLE advertising
    fn start_advertising(&mut self) -> Result<(), Self::Error>;

    /// Stop BLE advertising
    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    /// Drop the link to a connected central
    fn disconnect_peer(&mut self, peer: PeerHandle) -> Result<(), Self::Error>;

    /// Whether pairing with `peer` has completed
    fn is_paired(&self, peer: PeerHandle) -> bool;

    /// Push a new value to subscribers of `characteristic`
    fn notify(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), Self::Error>;
}
