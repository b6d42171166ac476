//! End-to-end provisioning over the public API: a phone writes credentials,
//! the device connects, notifies, reboots from storage and times out.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use picofcm_mcu::{
    commands, BleEvent, BleTransport, Characteristic, Clock, HttpClient, HttpResponse,
    NotifyError, PeerHandle, Provisioner, ProvisioningStatus, Storage, Wifi, WifiStatus,
    CONFIG_PATH,
};

#[derive(Default)]
struct Flash {
    files: HashMap<String, Vec<u8>>,
}

impl Storage for Flash {
    type Error = String;

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| format!("{path} not found"))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), String> {
        self.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), String> {
        self.files.remove(path);
        Ok(())
    }
}

struct Radio {
    status: WifiStatus,
    joined: Vec<String>,
    disconnects: usize,
}

impl Radio {
    fn new() -> Self {
        Self {
            status: WifiStatus::Disconnected,
            joined: Vec::new(),
            disconnects: 0,
        }
    }
}

impl Wifi for Radio {
    type Error = String;

    fn begin(&mut self, ssid: &str, _password: &str) -> Result<(), String> {
        self.joined.push(ssid.to_string());
        self.status = WifiStatus::Connecting;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), String> {
        self.disconnects += 1;
        self.status = WifiStatus::Disconnected;
        Ok(())
    }

    fn status(&self) -> WifiStatus {
        self.status
    }

    fn rssi(&self) -> i32 {
        -55
    }
}

#[derive(Default)]
struct Gatt {
    advertising: bool,
    dropped_peers: Vec<PeerHandle>,
    notifications: Vec<(Characteristic, Vec<u8>)>,
}

impl BleTransport for Gatt {
    type Error = String;

    fn start_advertising(&mut self) -> Result<(), String> {
        self.advertising = true;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), String> {
        self.advertising = false;
        Ok(())
    }

    fn disconnect_peer(&mut self, peer: PeerHandle) -> Result<(), String> {
        self.dropped_peers.push(peer);
        Ok(())
    }

    fn is_paired(&self, _peer: PeerHandle) -> bool {
        true
    }

    fn notify(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), String> {
        self.notifications.push((characteristic, value.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
struct ManualClock(Cell<u64>);

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

struct Endpoint {
    status: u16,
    posted: Vec<(String, serde_json::Value)>,
}

impl HttpClient for Endpoint {
    type Error = String;

    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, String> {
        let json = serde_json::from_slice(body).map_err(|e| e.to_string())?;
        self.posted.push((url.to_string(), json));
        Ok(HttpResponse {
            status: self.status,
            body: "ok".to_string(),
        })
    }
}

type Device = Provisioner<Radio, Gatt, Flash, ManualClock>;

fn device(flash: Flash) -> Device {
    Provisioner::new(Radio::new(), Gatt::default(), flash, ManualClock::default())
}

fn write(device: &mut Device, characteristic: Characteristic, data: &[u8]) {
    device.handle_event(BleEvent::Write {
        characteristic,
        data: data.to_vec(),
    });
}

#[test]
fn provision_connect_notify_and_reboot() {
    let mut device = device(Flash::default());
    let statuses = Rc::new(RefCell::new(Vec::new()));
    let sink = statuses.clone();
    device.set_status_callback(move |status| sink.borrow_mut().push(status));

    device.begin().unwrap();
    assert!(device.transport().advertising);
    assert_eq!(device.network_count(), 0);

    // phone connects, subscribes to pairing status and provisions
    device.handle_event(BleEvent::PeerConnected { peer: 9 });
    device.handle_event(BleEvent::SubscriptionChanged {
        characteristic: Characteristic::PairingStatus,
        subscribed: true,
    });
    assert_eq!(
        device.transport().notifications,
        [(Characteristic::PairingStatus, vec![0x01])]
    );
    assert_eq!(
        device.handle_read(Characteristic::PairingStatus),
        Some(vec![0x01])
    );

    write(&mut device, Characteristic::Ssid, b"Home");
    write(&mut device, Characteristic::Password, b"hunter22");
    write(&mut device, Characteristic::FcmUrl, b"https://push.example.com/send");
    write(&mut device, Characteristic::FcmToken, b"phone-token");
    write(&mut device, Characteristic::Command, &[commands::SAVE_NETWORK]);
    assert_eq!(device.network_count(), 1);
    assert!(device.storage().exists(CONFIG_PATH));

    write(&mut device, Characteristic::Command, &[commands::CONNECT]);
    assert_eq!(device.status(), ProvisioningStatus::Connecting);
    assert!(!device.transport().advertising);
    assert_eq!(device.transport().dropped_peers, [9]);
    assert_eq!(device.wifi().joined, ["Home"]);

    device.handle_event(BleEvent::PeerDisconnected);
    assert_eq!(device.peer(), None);

    device.wifi_mut().status = WifiStatus::Connected;
    device.tick();
    assert_eq!(device.status(), ProvisioningStatus::Connected);
    assert_eq!(device.rssi(), -55);

    let mut endpoint = Endpoint {
        status: 200,
        posted: Vec::new(),
    };
    device
        .send_notification(&mut endpoint, "Hello", "Device online")
        .unwrap();
    assert_eq!(endpoint.posted.len(), 1);
    assert_eq!(endpoint.posted[0].0, "https://push.example.com/send");
    assert_eq!(
        endpoint.posted[0].1,
        serde_json::json!({"token": "phone-token", "title": "Hello", "body": "Device online"})
    );

    endpoint.status = 500;
    assert!(matches!(
        device.send_notification(&mut endpoint, "Hello", "again"),
        Err(NotifyError::HttpStatus(500))
    ));
    assert_eq!(endpoint.posted.len(), 2);

    assert_eq!(
        *statuses.borrow(),
        [ProvisioningStatus::Connecting, ProvisioningStatus::Connected]
    );

    // reboot with the same flash, the network is out of range this time
    let flash = std::mem::take(device.storage_mut());
    let mut device = self::device(flash);
    device.begin().unwrap();
    assert_eq!(device.network_count(), 1);
    assert_eq!(
        device.credentials().endpoint().token.as_str(),
        "phone-token"
    );

    device.connect_to_stored_networks().unwrap();
    assert_eq!(device.wifi().joined, ["Home"]);

    device.clock().0.set(14_999);
    device.tick();
    assert_eq!(device.status(), ProvisioningStatus::Connecting);

    device.clock().0.set(15_001);
    device.tick();
    assert_eq!(device.status(), ProvisioningStatus::Failed);
    assert_eq!(device.wifi().disconnects, 1);

    // clearing wipes the record, a further reboot starts blank
    write(&mut device, Characteristic::Command, &[commands::CLEAR_NETWORKS]);
    assert_eq!(device.network_count(), 0);
    let flash = std::mem::take(device.storage_mut());
    assert!(!flash.exists(CONFIG_PATH));
    let mut device = self::device(flash);
    device.begin().unwrap();
    assert_eq!(device.network_count(), 0);
}
