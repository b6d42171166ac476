//! NimBLE GATT server for the provisioning service
//!
//! BLE callbacks run on the NimBLE host task. They only translate what
//! happened into [`BleEvent`]s and queue them; the main loop drains the queue
//! and feeds the events to the provisioner.

use esp32_nimble::{
    enums::{AuthReq, SecurityIOCap},
    utilities::{mutex::Mutex as NimbleMutex, BleUuid},
    uuid128, BLEAdvertisementData, BLEAdvertising, BLECharacteristic, BLEDevice, BLEError,
    BLEServer, NimbleProperties,
};
use log::*;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use picofcm_mcu::{BleEvent, BleTransport, Characteristic, PairingStatus, PeerHandle};

// These must match picofcm_proto::{SERVICE_UUID, SSID_UUID, ...}
// uuid128! needs literals to build the BleUuid at compile time
const SERVICE_UUID: BleUuid = uuid128!("5a67d678-6361-4f32-8396-54c6926c8fa1");
const SSID_UUID: BleUuid = uuid128!("5a67d678-6361-4f32-8396-54c6926c8fa2");
const PASSWORD_UUID: BleUuid = uuid128!("5a67d678-6361-4f32-8396-54c6926c8fa3");
const COMMAND_UUID: BleUuid = uuid128!("5a67d678-6361-4f32-8396-54c6926c8fa4");
const PAIRING_STATUS_UUID: BleUuid = uuid128!("5a67d678-6361-4f32-8396-54c6926c8fa5");
const FCM_URL_UUID: BleUuid = uuid128!("5a67d678-6361-4f32-8396-54c6926c8fa6");
const FCM_TOKEN_UUID: BleUuid = uuid128!("5a67d678-6361-4f32-8396-54c6926c8fa7");

/// Writable characteristics and the field each one stages
const WRITABLE: [(BleUuid, Characteristic); 5] = [
    (SSID_UUID, Characteristic::Ssid),
    (PASSWORD_UUID, Characteristic::Password),
    (COMMAND_UUID, Characteristic::Command),
    (FCM_URL_UUID, Characteristic::FcmUrl),
    (FCM_TOKEN_UUID, Characteristic::FcmToken),
];

/// Events queued by BLE callbacks, drained by the main loop
pub type EventQueue = Arc<Mutex<VecDeque<BleEvent>>>;

fn push(queue: &EventQueue, event: BleEvent) {
    match queue.lock() {
        Ok(mut q) => q.push_back(event),
        Err(_) => error!("BLE event queue poisoned, dropping event"),
    }
}

/// Take every queued event
pub fn drain(queue: &EventQueue) -> Vec<BleEvent> {
    match queue.lock() {
        Ok(mut q) => q.drain(..).collect(),
        Err(_) => Vec::new(),
    }
}

/// BLE transport backed by the NimBLE server
pub struct NimbleTransport {
    server: &'static mut BLEServer,
    advertising: &'static NimbleMutex<BLEAdvertising>,
    pairing: Arc<NimbleMutex<BLECharacteristic>>,
    paired: Arc<Mutex<HashSet<PeerHandle>>>,
}

impl NimbleTransport {
    /// Mirror the readable pairing status value
    pub fn set_pairing_value(&mut self, status: PairingStatus) {
        self.pairing.lock().set_value(&[status.as_byte()]);
    }
}

impl BleTransport for NimbleTransport {
    type Error = BLEError;

    fn start_advertising(&mut self) -> Result<(), BLEError> {
        self.advertising.lock().start()?;
        info!("BLE advertising started");
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), BLEError> {
        self.advertising.lock().stop()?;
        info!("BLE advertising stopped");
        Ok(())
    }

    fn disconnect_peer(&mut self, peer: PeerHandle) -> Result<(), BLEError> {
        self.server.disconnect(peer)
    }

    fn is_paired(&self, peer: PeerHandle) -> bool {
        self.paired
            .lock()
            .map(|paired| paired.contains(&peer))
            .unwrap_or(false)
    }

    fn notify(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), BLEError> {
        match characteristic {
            Characteristic::PairingStatus => {
                self.pairing.lock().set_value(value).notify();
            }
            other => debug!("{other:?} does not support notifications"),
        }
        Ok(())
    }
}

/// Start the GATT server and configure advertising
///
/// Advertising itself is started by the provisioner.
pub fn start_ble_server(device_name: &str, events: EventQueue) -> Result<NimbleTransport, BLEError> {
    let ble_device = BLEDevice::take();

    // Set the device name (this is what shows up in BLE scans)
    BLEDevice::set_device_name(device_name)?;

    // Just Works bonding
    ble_device
        .security()
        .set_auth(AuthReq::Bond)
        .set_io_cap(SecurityIOCap::NoInputNoOutput);

    let paired: Arc<Mutex<HashSet<PeerHandle>>> = Arc::new(Mutex::new(HashSet::new()));
    let server = ble_device.get_server();

    let connect_events = events.clone();
    server.on_connect(move |server, desc| {
        info!("BLE client connected");
        let _ = server.update_conn_params(desc.conn_handle(), 24, 48, 0, 60);
        push(
            &connect_events,
            BleEvent::PeerConnected {
                peer: desc.conn_handle(),
            },
        );
    });

    let disconnect_events = events.clone();
    let disconnect_paired = paired.clone();
    server.on_disconnect(move |desc, reason| {
        info!("BLE client disconnected: {reason:?}");
        if let Ok(mut p) = disconnect_paired.lock() {
            p.remove(&desc.conn_handle());
        }
        push(&disconnect_events, BleEvent::PeerDisconnected);
    });

    let auth_paired = paired.clone();
    server.on_authentication_complete(move |desc, result| match result {
        Ok(()) => {
            info!("BLE pairing complete");
            if let Ok(mut p) = auth_paired.lock() {
                p.insert(desc.conn_handle());
            }
        }
        Err(e) => warn!("BLE pairing failed: {e:?}"),
    });

    // Create the provisioning service
    let service = server.create_service(SERVICE_UUID);

    for (uuid, characteristic) in WRITABLE {
        let properties = match characteristic {
            Characteristic::Ssid => NimbleProperties::READ | NimbleProperties::WRITE,
            _ => NimbleProperties::WRITE,
        };
        let gatt = service.lock().create_characteristic(uuid, properties);
        let write_events = events.clone();
        gatt.lock().on_write(move |args| {
            push(
                &write_events,
                BleEvent::Write {
                    characteristic,
                    data: args.recv_data().to_vec(),
                },
            );
        });
    }

    // Pairing status characteristic (read/notify)
    let pairing = service.lock().create_characteristic(
        PAIRING_STATUS_UUID,
        NimbleProperties::READ | NimbleProperties::NOTIFY,
    );
    pairing
        .lock()
        .set_value(&[PairingStatus::NotPaired.as_byte()]);
    let subscribe_events = events;
    pairing.lock().on_subscribe(move |_characteristic, _desc, sub| {
        push(
            &subscribe_events,
            BleEvent::SubscriptionChanged {
                characteristic: Characteristic::PairingStatus,
                subscribed: !sub.is_empty(),
            },
        );
    });

    let advertising = ble_device.get_advertising();
    advertising.lock().set_data(
        BLEAdvertisementData::new()
            .name(device_name)
            .add_service_uuid(SERVICE_UUID),
    )?;
    info!("BLE GATT server ready as '{device_name}'");

    Ok(NimbleTransport {
        server,
        advertising,
        pairing,
        paired,
    })
}
