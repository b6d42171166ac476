//! WiFi Abstraction Traits
//!
//! Traits for WiFi operations that MCU-specific crates implement.

use std::fmt;

/// WiFi link status as reported by the network stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiStatus {
    /// Radio up, no association requested
    Idle,
    /// Association or DHCP in progress
    Connecting,
    Connected,
    /// Authentication or association was refused
    ConnectFailed,
    /// The requested SSID is not in range
    NoNetworkAvailable,
    Disconnected,
}

impl WifiStatus {
    /// Whether the stack gave up on the current connection attempt
    pub fn is_failure(self) -> bool {
        matches!(self, WifiStatus::ConnectFailed | WifiStatus::NoNetworkAvailable)
    }
}

impl fmt::Display for WifiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WifiStatus::Idle => "idle",
            WifiStatus::Connecting => "connecting",
            WifiStatus::Connected => "connected",
            WifiStatus::ConnectFailed => "connect failed",
            WifiStatus::NoNetworkAvailable => "no network available",
            WifiStatus::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Trait for WiFi operations
///
/// MCU-specific crates implement this trait using their WiFi stack.
/// `begin` only starts an attempt; progress is observed through `status`.
pub trait Wifi {
    /// Error type for WiFi operations
    type Error: fmt::Debug;

    /// Start connecting to a network without waiting for the result
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;

    /// Drop the current association (or abort a pending one)
    fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Get current link status
    fn status(&self) -> WifiStatus;

    /// Signal strength of the current association in dBm
    fn rssi(&self) -> i32;

    /// Check if connected
    fn is_connected(&self) -> bool {
        self.status() == WifiStatus::Connected
    }
}
