//! BLE Client for provisioning PicoFCM devices
//!
//! Provides functions to scan for PicoFCM devices, stage WiFi credentials
//! and the notification endpoint, and send provisioning commands.

use btleplug::api::{
    Central, Characteristic as GattCharacteristic, Manager as _, Peripheral as _,
    PeripheralProperties, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use log::{debug, info};
use std::time::Duration;
use uuid::Uuid;

use picofcm_proto::{Characteristic, Command, DEFAULT_DEVICE_NAME, PairingStatus, SERVICE_UUID};

use crate::ControllerError;

/// How long `find_device` scans before giving up
pub const FIND_SCAN_SECS: u64 = 5;

/// A discovered BLE device
#[derive(Debug, Clone)]
pub struct PicoDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    pub is_picofcm: bool,
}

/// Notification endpoint written alongside a network
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub url: &'a str,
    pub token: &'a str,
}

/// Parse the UUID of a provisioning characteristic
pub fn characteristic_uuid(characteristic: Characteristic) -> Result<Uuid, ControllerError> {
    Ok(Uuid::parse_str(characteristic.uuid())?)
}

/// Whether an advertised name belongs to a PicoFCM device
///
/// Matches "PicoFCM-xxx" and the "nimble [PicoFCM-xxx]" form some hosts report.
pub fn is_picofcm_name(name: &str) -> bool {
    name.starts_with(DEFAULT_DEVICE_NAME) || name.contains(&format!("[{DEFAULT_DEVICE_NAME}"))
}

/// Whether a device matches the requested target, or any PicoFCM device when none is given
pub fn matches_target(name: &str, address: &str, advertises_service: bool, target: Option<&str>) -> bool {
    match target {
        Some(t) => name.contains(t) || address.eq_ignore_ascii_case(t) || address.contains(t),
        None => advertises_service || is_picofcm_name(name),
    }
}

/// Reject a field value the device would truncate
pub fn validate_field(characteristic: Characteristic, value: &str) -> Result<(), ControllerError> {
    match characteristic.max_len() {
        Some(max) if value.len() > max => Err(ControllerError::InvalidInput(format!(
            "{characteristic:?} is {} bytes, the device accepts at most {max}",
            value.len()
        ))),
        _ => Ok(()),
    }
}

fn validate_network(ssid: &str, password: &str) -> Result<(), ControllerError> {
    if ssid.is_empty() {
        return Err(ControllerError::InvalidInput("SSID must not be empty".to_string()));
    }
    validate_field(Characteristic::Ssid, ssid)?;
    validate_field(Characteristic::Password, password)
}

fn validate_endpoint(endpoint: &Endpoint<'_>) -> Result<(), ControllerError> {
    validate_field(Characteristic::FcmUrl, endpoint.url)?;
    validate_field(Characteristic::FcmToken, endpoint.token)
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, ControllerError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(ControllerError::NoAdapter)
}

fn advertises_service(props: &PeripheralProperties) -> Result<bool, ControllerError> {
    let service = Uuid::parse_str(SERVICE_UUID)?;
    Ok(props.services.contains(&service))
}

/// Scan for BLE devices
///
/// Returns every discovered device. PicoFCM devices have `is_picofcm = true`.
pub async fn scan(duration_secs: u64) -> Result<Vec<PicoDevice>, ControllerError> {
    let adapter = get_adapter().await?;

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let advertised = advertises_service(&props)?;
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let address = peripheral.address().to_string();
            let is_picofcm = advertised || is_picofcm_name(&name);

            devices.push(PicoDevice {
                name,
                address,
                rssi: props.rssi,
                is_picofcm,
            });
        }
    }

    adapter.stop_scan().await?;
    Ok(devices)
}

/// Find a device by name/address pattern, or find any PicoFCM device
pub async fn find_device(target: Option<&str>) -> Result<Peripheral, ControllerError> {
    let adapter = get_adapter().await?;

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(FIND_SCAN_SECS)).await;

    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let advertised = advertises_service(&props)?;
            let name = props.local_name.unwrap_or_default();
            let address = peripheral.address().to_string();

            if matches_target(&name, &address, advertised, target) {
                adapter.stop_scan().await?;
                info!("Found device: {name} ({address})");
                return Ok(peripheral);
            }
        }
    }

    adapter.stop_scan().await?;
    Err(ControllerError::DeviceNotFound)
}

/// A connected device with its services discovered
pub struct Session {
    device: Peripheral,
    characteristics: Vec<GattCharacteristic>,
}

impl Session {
    /// Locate, connect to and discover a device
    pub async fn open(target: Option<&str>) -> Result<Self, ControllerError> {
        let device = find_device(target).await?;

        device.connect().await?;
        device.discover_services().await?;
        let characteristics = device.characteristics().into_iter().collect();

        Ok(Self {
            device,
            characteristics,
        })
    }

    fn characteristic(&self, which: Characteristic) -> Result<&GattCharacteristic, ControllerError> {
        let uuid = characteristic_uuid(which)?;
        self.characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .ok_or(ControllerError::CharacteristicNotFound(which))
    }

    /// Write a staged field (SSID, password, endpoint URL or token)
    pub async fn write_field(&self, which: Characteristic, value: &str) -> Result<(), ControllerError> {
        validate_field(which, value)?;
        let characteristic = self.characteristic(which)?;
        debug!("Writing {} bytes to {which:?}", value.len());
        self.device
            .write(characteristic, value.as_bytes(), WriteType::WithResponse)
            .await?;
        Ok(())
    }

    /// Write a single command byte
    pub async fn send_command(&self, command: Command) -> Result<(), ControllerError> {
        let characteristic = self.characteristic(Characteristic::Command)?;
        debug!("Sending command {command:?} (0x{:02x})", command.as_byte());
        self.device
            .write(characteristic, &[command.as_byte()], WriteType::WithResponse)
            .await?;
        Ok(())
    }

    /// Read and decode the pairing status characteristic
    pub async fn read_pairing_status(&self) -> Result<PairingStatus, ControllerError> {
        let characteristic = self.characteristic(Characteristic::PairingStatus)?;
        let value = self.device.read(characteristic).await?;
        let decoded = match value.as_slice() {
            [byte] => PairingStatus::from_byte(*byte),
            _ => None,
        };
        decoded.ok_or(ControllerError::UnexpectedValue(value))
    }

    pub async fn close(self) -> Result<(), ControllerError> {
        self.device.disconnect().await?;
        Ok(())
    }
}

/// Store a network (and optionally the notification endpoint) on a device
///
/// # Arguments
/// * `target` - Device name/address pattern, or None to find any PicoFCM device
/// * `ssid` - WiFi network name
/// * `password` - WiFi password
/// * `endpoint` - Notification endpoint to store with it
pub async fn save_network(
    target: Option<&str>,
    ssid: &str,
    password: &str,
    endpoint: Option<&Endpoint<'_>>,
) -> Result<(), ControllerError> {
    validate_network(ssid, password)?;
    if let Some(endpoint) = endpoint {
        validate_endpoint(endpoint)?;
    }

    let session = Session::open(target).await?;
    session.write_field(Characteristic::Ssid, ssid).await?;
    session.write_field(Characteristic::Password, password).await?;
    if let Some(endpoint) = endpoint {
        session.write_field(Characteristic::FcmUrl, endpoint.url).await?;
        session.write_field(Characteristic::FcmToken, endpoint.token).await?;
    }
    session.send_command(Command::SaveNetwork).await?;

    session.close().await
}

/// Ask a device to join a network without storing it
///
/// The device drops the BLE link as soon as the attempt starts.
pub async fn connect(target: Option<&str>, ssid: &str, password: &str) -> Result<(), ControllerError> {
    validate_network(ssid, password)?;

    let session = Session::open(target).await?;
    session.write_field(Characteristic::Ssid, ssid).await?;
    session.write_field(Characteristic::Password, password).await?;
    session.send_command(Command::Connect).await?;

    tolerate_link_loss(session.close().await);
    Ok(())
}

/// Ask a device to join its first stored network
pub async fn connect_stored(target: Option<&str>) -> Result<(), ControllerError> {
    let session = Session::open(target).await?;
    // an empty SSID makes the device fall back to its stored networks
    session.write_field(Characteristic::Ssid, "").await?;
    session.send_command(Command::Connect).await?;

    tolerate_link_loss(session.close().await);
    Ok(())
}

/// Log a failed disconnect after a connect command
///
/// The device drops the BLE link itself as the WiFi attempt starts.
fn tolerate_link_loss(closed: Result<(), ControllerError>) {
    if let Err(e) = closed {
        debug!("Link already gone after connect command: {e}");
    }
}

/// Erase every stored network and the notification endpoint
pub async fn clear(target: Option<&str>) -> Result<(), ControllerError> {
    send_single(target, Command::ClearNetworks).await
}

/// Drop the device's WiFi connection
pub async fn disconnect(target: Option<&str>) -> Result<(), ControllerError> {
    send_single(target, Command::Disconnect).await
}

async fn send_single(target: Option<&str>, command: Command) -> Result<(), ControllerError> {
    let session = Session::open(target).await?;
    session.send_command(command).await?;
    session.close().await
}

/// Read whether the device considers this host paired
pub async fn pairing_status(target: Option<&str>) -> Result<PairingStatus, ControllerError> {
    let session = Session::open(target).await?;
    let status = session.read_pairing_status().await?;
    session.close().await?;
    Ok(status)
}
