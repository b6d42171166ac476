//! PicoFCM Notifier for ESP32
//!
//! This firmware exposes the PicoFCM provisioning service over BLE. A phone
//! (or the picofcm-ble CLI) writes WiFi credentials and a push notification
//! endpoint, the device joins the network and announces itself with a push
//! notification.

mod ble;
mod http;
mod storage;
mod wifi;

use esp_idf_svc::{
    eventloop::EspSystemEventLoop, hal::prelude::Peripherals, nvs::EspDefaultNvsPartition,
    wifi::EspWifi,
};
use log::*;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use picofcm_mcu::{MonotonicClock, Provisioner, ProvisioningStatus};
use picofcm_proto::DEFAULT_DEVICE_NAME;

/// Advertised BLE name, overridable at build time
const DEVICE_NAME: &str = match option_env!("PICOFCM_DEVICE_NAME") {
    Some(name) => name,
    None => DEFAULT_DEVICE_NAME,
};

/// How often the main loop drains BLE events and advances the state machine
const LOOP_INTERVAL: Duration = Duration::from_millis(100);

const ONLINE_TITLE: &str = "PicoFCM";
const ONLINE_BODY: &str = "Device online";

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("PicoFCM Notifier v0.1");
    info!("Initializing...");

    // Get peripherals
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let events: ble::EventQueue = Arc::new(Mutex::new(VecDeque::new()));
    let transport = ble::start_ble_server(DEVICE_NAME, events.clone())
        .map_err(|e| anyhow::anyhow!("BLE init failed: {e:?}"))?;

    let wifi = wifi::StationWifi::new(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs.clone()))?,
        &sys_loop,
    )?;
    let storage = storage::NvsStorage::new(nvs)?;

    let mut provisioner = Provisioner::new(wifi, transport, storage, MonotonicClock::new());

    let came_online = Rc::new(Cell::new(false));
    let flag = came_online.clone();
    provisioner.set_status_callback(move |status| {
        info!("Provisioning status: {status}");
        if status == ProvisioningStatus::Connected {
            flag.set(true);
        }
    });
    provisioner.set_wifi_status_callback(|status| info!("WiFi status: {status}"));
    provisioner.set_ble_connection_callback(|connected| {
        info!("BLE {}", if connected { "connected" } else { "disconnected" });
    });

    provisioner
        .begin()
        .map_err(|e| anyhow::anyhow!("BLE advertising failed: {e:?}"))?;
    info!("BLE provisioning enabled as '{DEVICE_NAME}'");

    if provisioner.network_count() > 0 {
        if let Err(e) = provisioner.connect_to_stored_networks() {
            warn!("Not connecting to stored networks: {e}");
        }
    } else {
        warn!("No WiFi networks configured!");
        warn!("Use BLE provisioning (picofcm-ble save) to configure WiFi");
    }

    let mut http = http::EspHttp;
    let mut announced = false;

    loop {
        for event in ble::drain(&events) {
            provisioner.handle_event(event);
        }
        provisioner.tick();

        let pairing = provisioner.pairing_status();
        provisioner.transport_mut().set_pairing_value(pairing);

        if came_online.replace(false) && !announced {
            info!("WiFi connected, RSSI {} dBm", provisioner.rssi());
            match provisioner.send_notification(&mut http, ONLINE_TITLE, ONLINE_BODY) {
                Ok(()) => info!("Online notification sent"),
                Err(e) => warn!("Online notification failed: {e}"),
            }
            announced = true;
        }

        std::thread::sleep(LOOP_INTERVAL);
    }
}
