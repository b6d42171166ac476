//! The provisioning context
//!
//! [`Provisioner`] owns the collaborators and all provisioning state. The
//! host calls [`Provisioner::handle_event`] for everything the BLE stack
//! reports and [`Provisioner::tick`] at a steady cadence; nothing else drives
//! it.

use log::*;
use picofcm_proto::{Characteristic, PairingStatus};

use crate::ble::{BleEvent, BleTransport, PeerHandle};
use crate::clock::Clock;
use crate::credentials::CredentialStore;
use crate::error::{ConnectError, CredentialError, NotifyError, PersistenceError};
use crate::http::HttpClient;
use crate::notify;
use crate::staging::StagingBuffers;
use crate::state::{PollOutcome, ProvisioningStatus, StateMachine};
use crate::storage::Storage;
use crate::wifi::{Wifi, WifiStatus};

type WifiStatusCallback = Box<dyn FnMut(WifiStatus)>;
type BleConnectionCallback = Box<dyn FnMut(bool)>;

/// WiFi provisioning and notification service
pub struct Provisioner<W, B, S, C> {
    pub(crate) wifi: W,
    pub(crate) transport: B,
    pub(crate) storage: S,
    pub(crate) clock: C,
    pub(crate) store: CredentialStore,
    pub(crate) staging: StagingBuffers,
    pub(crate) machine: StateMachine,
    peer: Option<PeerHandle>,
    pairing_subscribed: bool,
    last_wifi_status: Option<WifiStatus>,
    wifi_status_callback: Option<WifiStatusCallback>,
    ble_connection_callback: Option<BleConnectionCallback>,
}

impl<W, B, S, C> Provisioner<W, B, S, C>
where
    W: Wifi,
    B: BleTransport,
    S: Storage,
    C: Clock,
{
    pub fn new(wifi: W, transport: B, storage: S, clock: C) -> Self {
        Self {
            wifi,
            transport,
            storage,
            clock,
            store: CredentialStore::new(),
            staging: StagingBuffers::new(),
            machine: StateMachine::new(),
            peer: None,
            pairing_subscribed: false,
            last_wifi_status: None,
            wifi_status_callback: None,
            ble_connection_callback: None,
        }
    }

    /// Load the stored configuration and start advertising
    ///
    /// A missing or unreadable record leaves the store empty.
    pub fn begin(&mut self) -> Result<(), B::Error> {
        match self.store.load(&self.storage) {
            Ok(_) => {}
            Err(PersistenceError::NotFound(path)) => info!("No stored configuration at {path}"),
            Err(e) => warn!("Ignoring stored configuration: {e}"),
        }

        self.publish_pairing_status(PairingStatus::NotPaired);
        self.transport.start_advertising()?;
        info!("FCM Notifier service started");
        Ok(())
    }

    /// Advance the connection attempt and report WiFi status changes
    pub fn tick(&mut self) {
        let wifi_status = self.wifi.status();

        match self.machine.poll(wifi_status, self.clock.now_ms()) {
            PollOutcome::Connected => info!("WiFi connected!"),
            PollOutcome::Rejected(status) => warn!("WiFi connection failed: {status}"),
            PollOutcome::TimedOut => {
                warn!("WiFi connection timed out");
                if let Err(e) = self.wifi.disconnect() {
                    warn!("Failed to disconnect WiFi after timeout: {e:?}");
                }
            }
            PollOutcome::NotConnecting | PollOutcome::Pending => {}
        }

        if self.last_wifi_status != Some(wifi_status) {
            if let Some(callback) = self.wifi_status_callback.as_mut() {
                callback(wifi_status);
            }
            self.last_wifi_status = Some(wifi_status);
        }
    }

    /// Apply an event delivered by the BLE stack
    pub fn handle_event(&mut self, event: BleEvent) {
        match event {
            BleEvent::PeerConnected { peer } => {
                info!("BLE device connected");
                self.peer = Some(peer);
                self.report_ble_connection(true);
            }
            BleEvent::PeerConnectFailed => {
                self.peer = None;
                self.report_ble_connection(false);
            }
            BleEvent::PeerDisconnected => {
                info!("BLE device disconnected");
                self.publish_pairing_status(PairingStatus::NotPaired);
                self.peer = None;
                self.pairing_subscribed = false;
                self.report_ble_connection(false);
            }
            BleEvent::Write {
                characteristic,
                data,
            } => self.handle_write(characteristic, &data),
            BleEvent::SubscriptionChanged {
                characteristic,
                subscribed,
            } => self.handle_subscription(characteristic, subscribed),
        }
    }

    /// Value returned for a read of `characteristic`
    ///
    /// Only the pairing status is readable.
    pub fn handle_read(&self, characteristic: Characteristic) -> Option<Vec<u8>> {
        match characteristic {
            Characteristic::PairingStatus => Some(vec![self.pairing_status().as_byte()]),
            _ => None,
        }
    }

    fn handle_write(&mut self, characteristic: Characteristic, data: &[u8]) {
        match characteristic {
            Characteristic::Command => match data.first() {
                Some(&command) => self.process_command(command),
                None => debug!("Ignoring empty command write"),
            },
            Characteristic::PairingStatus => debug!("Ignoring write to pairing status"),
            field => {
                self.staging.write(field, data);
            }
        }
    }

    fn handle_subscription(&mut self, characteristic: Characteristic, subscribed: bool) {
        if characteristic != Characteristic::PairingStatus {
            debug!("Ignoring subscription change on {characteristic:?}");
            return;
        }

        self.pairing_subscribed = subscribed;
        if subscribed {
            self.publish_pairing_status(self.pairing_status());
        }
    }

    /// Paired once a central is connected and pairing with it completed
    pub fn pairing_status(&self) -> PairingStatus {
        let paired = self
            .peer
            .is_some_and(|peer| self.transport.is_paired(peer));
        PairingStatus::from(paired)
    }

    /// Notify subscribers of the pairing status characteristic
    pub fn publish_pairing_status(&mut self, status: PairingStatus) {
        if !self.pairing_subscribed {
            return;
        }

        let value = [status.as_byte()];
        match self.transport.notify(Characteristic::PairingStatus, &value) {
            Ok(()) => info!("Sent pairing status update: {}", value[0]),
            Err(e) => warn!("Failed to notify pairing status: {e:?}"),
        }
    }

    fn report_ble_connection(&mut self, connected: bool) {
        if let Some(callback) = self.ble_connection_callback.as_mut() {
            callback(connected);
        }
    }

    /// Add or update a stored network in memory
    pub fn save_network(&mut self, ssid: &str, password: &str) -> Result<(), CredentialError> {
        self.store.upsert(ssid, password)
    }

    /// Persist the stored networks and the staged endpoint fields
    pub fn save_config(&mut self) -> Result<(), PersistenceError> {
        self.store.save(
            &mut self.storage,
            self.staging.fcm_url.as_str(),
            self.staging.fcm_token.as_str(),
        )
    }

    /// Erase all stored networks and the endpoint, in memory and on storage
    pub fn clear_networks(&mut self) -> Result<(), PersistenceError> {
        self.store.clear_all(&mut self.storage)
    }

    /// Start connecting to the first enabled stored network
    ///
    /// Later networks are not tried automatically when this one fails.
    pub fn connect_to_stored_networks(&mut self) -> Result<(), ConnectError> {
        match self.machine.status() {
            ProvisioningStatus::Connecting => return Err(ConnectError::AlreadyConnecting),
            ProvisioningStatus::Connected => return Err(ConnectError::AlreadyConnected),
            _ => {}
        }

        let Some(network) = self.store.enabled().next().cloned() else {
            return Err(ConnectError::NoStoredNetworks);
        };

        info!("Attempting to connect to stored network: {}", network.ssid);
        self.connect_to_network(network.ssid.as_str(), network.password.as_str())
    }

    /// Start connecting to a network without storing it
    ///
    /// Advertising stops and any BLE central is dropped before the radio is
    /// reconfigured. The outcome arrives through [`tick`](Self::tick).
    pub fn connect_to_network(&mut self, ssid: &str, password: &str) -> Result<(), ConnectError> {
        if ssid.is_empty() {
            warn!("SSID is empty, connection aborted");
            return Err(ConnectError::EmptyName);
        }

        self.machine
            .begin_connection_attempt(self.clock.now_ms())?;
        info!("Connecting to WiFi: {ssid}");

        if let Err(e) = self.transport.stop_advertising() {
            warn!("Failed to stop advertising: {e:?}");
        }
        if let Some(peer) = self.peer {
            if let Err(e) = self.transport.disconnect_peer(peer) {
                warn!("Failed to disconnect BLE peer: {e:?}");
            }
        }
        if self.wifi.status() != WifiStatus::Disconnected {
            if let Err(e) = self.wifi.disconnect() {
                warn!("Failed to disconnect WiFi: {e:?}");
            }
        }

        if let Err(e) = self.wifi.begin(ssid, password) {
            error!("WiFi begin failed: {e:?}");
            self.machine.set(ProvisioningStatus::Failed);
            return Err(ConnectError::Begin(format!("{e:?}")));
        }
        self.machine.restart_attempt_timer(self.clock.now_ms());
        Ok(())
    }

    /// Send a push notification through the configured endpoint
    pub fn send_notification<H: HttpClient>(
        &self,
        http: &mut H,
        title: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        notify::send(http, self.wifi.status(), self.store.endpoint(), title, body)
    }

    pub fn status(&self) -> ProvisioningStatus {
        self.machine.status()
    }

    pub fn network_count(&self) -> usize {
        self.store.len()
    }

    /// Signal strength of the current WiFi association in dBm
    pub fn rssi(&self) -> i32 {
        self.wifi.rssi()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    pub fn staging(&self) -> &StagingBuffers {
        &self.staging
    }

    pub fn peer(&self) -> Option<PeerHandle> {
        self.peer
    }

    /// Register the provisioning status observer (replaces the previous one)
    pub fn set_status_callback(&mut self, callback: impl FnMut(ProvisioningStatus) + 'static) {
        self.machine.set_callback(callback);
    }

    /// Register the WiFi status observer (replaces the previous one)
    pub fn set_wifi_status_callback(&mut self, callback: impl FnMut(WifiStatus) + 'static) {
        self.wifi_status_callback = Some(Box::new(callback));
    }

    /// Register the BLE connection observer (replaces the previous one)
    pub fn set_ble_connection_callback(&mut self, callback: impl FnMut(bool) + 'static) {
        self.ble_connection_callback = Some(Box::new(callback));
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut W {
        &mut self.wifi
    }

    pub fn transport(&self) -> &B {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut B {
        &mut self.transport
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
