//! In-memory collaborators for unit tests

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use picofcm_proto::Characteristic;

use crate::ble::{BleTransport, PeerHandle};
use crate::clock::Clock;
use crate::http::{HttpClient, HttpResponse};
use crate::provisioner::Provisioner;
use crate::storage::Storage;
use crate::wifi::{Wifi, WifiStatus};

pub type TestProvisioner = Provisioner<FakeWifi, FakeTransport, MemoryStorage, FakeClock>;

pub fn provisioner() -> TestProvisioner {
    Provisioner::new(
        FakeWifi::default(),
        FakeTransport::default(),
        MemoryStorage::default(),
        FakeClock::default(),
    )
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub records: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
    pub fail_removes: bool,
}

impl MemoryStorage {
    pub fn put(&mut self, path: &str, data: &[u8]) {
        self.records.insert(path.to_string(), data.to_vec());
    }
}

impl Storage for MemoryStorage {
    type Error = &'static str;

    fn exists(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, Self::Error> {
        self.records.get(path).cloned().ok_or("no such record")
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err("write failed");
        }
        self.put(path, data);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), Self::Error> {
        if self.fail_removes {
            return Err("remove failed");
        }
        self.records.remove(path);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiCall {
    Begin { ssid: String, password: String },
    Disconnect,
}

#[derive(Debug)]
pub struct FakeWifi {
    pub status: WifiStatus,
    pub rssi: i32,
    pub fail_begin: bool,
    /// Clock advanced by `begin`, and by how many ms
    pub begin_takes: Option<(Rc<Cell<u64>>, u64)>,
    pub calls: Vec<WifiCall>,
}

impl Default for FakeWifi {
    fn default() -> Self {
        Self {
            status: WifiStatus::Disconnected,
            rssi: 0,
            fail_begin: false,
            begin_takes: None,
            calls: Vec::new(),
        }
    }
}

impl Wifi for FakeWifi {
    type Error = &'static str;

    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error> {
        self.calls.push(WifiCall::Begin {
            ssid: ssid.to_string(),
            password: password.to_string(),
        });
        if let Some((clock, ms)) = &self.begin_takes {
            clock.set(clock.get() + ms);
        }
        if self.fail_begin {
            return Err("begin failed");
        }
        self.status = WifiStatus::Connecting;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.calls.push(WifiCall::Disconnect);
        self.status = WifiStatus::Disconnected;
        Ok(())
    }

    fn status(&self) -> WifiStatus {
        self.status
    }

    fn rssi(&self) -> i32 {
        self.rssi
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    StartAdvertising,
    StopAdvertising,
    DisconnectPeer(PeerHandle),
    Notify(Characteristic, Vec<u8>),
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    pub paired: bool,
    pub calls: Vec<TransportCall>,
}

impl BleTransport for FakeTransport {
    type Error = &'static str;

    fn start_advertising(&mut self) -> Result<(), Self::Error> {
        self.calls.push(TransportCall::StartAdvertising);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), Self::Error> {
        self.calls.push(TransportCall::StopAdvertising);
        Ok(())
    }

    fn disconnect_peer(&mut self, peer: PeerHandle) -> Result<(), Self::Error> {
        self.calls.push(TransportCall::DisconnectPeer(peer));
        Ok(())
    }

    fn is_paired(&self, _peer: PeerHandle) -> bool {
        self.paired
    }

    fn notify(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), Self::Error> {
        self.calls
            .push(TransportCall::Notify(characteristic, value.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeClock {
    now: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    /// Handle that moves this clock from elsewhere
    pub fn shared(&self) -> Rc<Cell<u64>> {
        Rc::clone(&self.now)
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug)]
pub struct FakeHttp {
    pub status: Option<u16>,
    pub requests: Vec<(String, Vec<u8>)>,
}

impl FakeHttp {
    pub fn responding(status: u16) -> Self {
        Self {
            status: Some(status),
            requests: Vec::new(),
        }
    }

    pub fn failing() -> Self {
        Self {
            status: None,
            requests: Vec::new(),
        }
    }
}

impl HttpClient for FakeHttp {
    type Error = &'static str;

    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, Self::Error> {
        self.requests.push((url.to_string(), body.to_vec()));
        let status = self.status.ok_or("connection refused")?;
        Ok(HttpResponse {
            status,
            body: String::from("{}"),
        })
    }
}
