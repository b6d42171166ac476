//! BLE GATT protocol for PicoFCM device provisioning
//!
//! Shared by the device firmware and the operator tooling. Byte values and
//! UUIDs here are the wire contract and must not change.

/// Name the device advertises when none is configured
pub const DEFAULT_DEVICE_NAME: &str = "PicoFCM";

/// Maximum number of stored WiFi networks
pub const MAX_WIFI_NETWORKS: usize = 5;
/// Maximum SSID length in bytes
pub const MAX_SSID_LENGTH: usize = 32;
/// Maximum WiFi password length in bytes
pub const MAX_PASSWORD_LENGTH: usize = 64;
/// Maximum notification endpoint URL length in bytes
pub const MAX_FCM_URL_LENGTH: usize = 256;
/// Maximum notification endpoint token length in bytes
pub const MAX_FCM_TOKEN_LENGTH: usize = 256;

/// Path of the persisted configuration record
pub const CONFIG_PATH: &str = "/wifi_config.json";

/// BLE Service UUID
pub const SERVICE_UUID: &str = "5a67d678-6361-4f32-8396-54c6926c8fa1";

/// WiFi SSID Characteristic UUID (read/write)
pub const SSID_UUID: &str = "5a67d678-6361-4f32-8396-54c6926c8fa2";

/// WiFi Password Characteristic UUID (write)
pub const PASSWORD_UUID: &str = "5a67d678-6361-4f32-8396-54c6926c8fa3";

/// Command Characteristic UUID (write)
pub const COMMAND_UUID: &str = "5a67d678-6361-4f32-8396-54c6926c8fa4";

/// Pairing Status Characteristic UUID (read/notify)
pub const PAIRING_STATUS_UUID: &str = "5a67d678-6361-4f32-8396-54c6926c8fa5";

/// Notification endpoint URL Characteristic UUID (write)
pub const FCM_URL_UUID: &str = "5a67d678-6361-4f32-8396-54c6926c8fa6";

/// Notification endpoint token Characteristic UUID (write)
pub const FCM_TOKEN_UUID: &str = "5a67d678-6361-4f32-8396-54c6926c8fa7";

/// Command bytes written to the command characteristic
pub mod commands {
    /// Store the staged SSID/password and persist the configuration
    pub const SAVE_NETWORK: u8 = 0x01;

    /// Connect to the staged network, or the first stored one if none is staged
    pub const CONNECT: u8 = 0x02;

    /// Erase all stored networks and the notification endpoint
    pub const CLEAR_NETWORKS: u8 = 0x03;

    /// Reserved
    pub const GET_STATUS: u8 = 0x04;

    /// Disconnect from WiFi
    pub const DISCONNECT: u8 = 0x05;

    /// Reserved
    pub const START_SCAN: u8 = 0x06;

    /// Reserved
    pub const GET_SCAN_RESULTS: u8 = 0x07;
}

/// Pairing status byte values
pub mod pairing {
    pub const NOT_PAIRED: u8 = 0x00;
    pub const PAIRED: u8 = 0x01;
}

/// Characteristics of the provisioning service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    Ssid,
    Password,
    Command,
    PairingStatus,
    FcmUrl,
    FcmToken,
}

impl Characteristic {
    pub const ALL: [Characteristic; 6] = [
        Characteristic::Ssid,
        Characteristic::Password,
        Characteristic::Command,
        Characteristic::PairingStatus,
        Characteristic::FcmUrl,
        Characteristic::FcmToken,
    ];

    pub fn uuid(self) -> &'static str {
        match self {
            Characteristic::Ssid => SSID_UUID,
            Characteristic::Password => PASSWORD_UUID,
            Characteristic::Command => COMMAND_UUID,
            Characteristic::PairingStatus => PAIRING_STATUS_UUID,
            Characteristic::FcmUrl => FCM_URL_UUID,
            Characteristic::FcmToken => FCM_TOKEN_UUID,
        }
    }

    /// Case-insensitive lookup by UUID string
    pub fn from_uuid(uuid: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.uuid().eq_ignore_ascii_case(uuid))
    }

    /// Maximum value length accepted for a staged field
    pub fn max_len(self) -> Option<usize> {
        match self {
            Characteristic::Ssid => Some(MAX_SSID_LENGTH),
            Characteristic::Password => Some(MAX_PASSWORD_LENGTH),
            Characteristic::FcmUrl => Some(MAX_FCM_URL_LENGTH),
            Characteristic::FcmToken => Some(MAX_FCM_TOKEN_LENGTH),
            Characteristic::Command | Characteristic::PairingStatus => None,
        }
    }
}

/// Decoded command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SaveNetwork,
    Connect,
    ClearNetworks,
    GetStatus,
    Disconnect,
    StartScan,
    GetScanResults,
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            commands::SAVE_NETWORK => Some(Command::SaveNetwork),
            commands::CONNECT => Some(Command::Connect),
            commands::CLEAR_NETWORKS => Some(Command::ClearNetworks),
            commands::GET_STATUS => Some(Command::GetStatus),
            commands::DISCONNECT => Some(Command::Disconnect),
            commands::START_SCAN => Some(Command::StartScan),
            commands::GET_SCAN_RESULTS => Some(Command::GetScanResults),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Command::SaveNetwork => commands::SAVE_NETWORK,
            Command::Connect => commands::CONNECT,
            Command::ClearNetworks => commands::CLEAR_NETWORKS,
            Command::GetStatus => commands::GET_STATUS,
            Command::Disconnect => commands::DISCONNECT,
            Command::StartScan => commands::START_SCAN,
            Command::GetScanResults => commands::GET_SCAN_RESULTS,
        }
    }
}

/// Value of the pairing status characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStatus {
    NotPaired,
    Paired,
}

impl PairingStatus {
    pub fn as_byte(self) -> u8 {
        match self {
            PairingStatus::NotPaired => pairing::NOT_PAIRED,
            PairingStatus::Paired => pairing::PAIRED,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            pairing::NOT_PAIRED => Some(PairingStatus::NotPaired),
            pairing::PAIRED => Some(PairingStatus::Paired),
            _ => None,
        }
    }
}

impl From<bool> for PairingStatus {
    fn from(paired: bool) -> Self {
        if paired {
            PairingStatus::Paired
        } else {
            PairingStatus::NotPaired
        }
    }
}
