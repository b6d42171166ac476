//! Station-mode WiFi backed by `EspWifi`
//!
//! `EspWifi::connect` returns as soon as the attempt is started. Failures
//! arrive later as `StaDisconnected` events on the system event loop; their
//! reason code is kept so that `status` can report them.

use anyhow::anyhow;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::sys::{esp, esp_wifi_sta_get_ap_info, wifi_ap_record_t};
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent};
use log::*;
use std::sync::{Arc, Mutex};

use picofcm_mcu::{Wifi, WifiStatus};

// wifi_err_reason_t values that end an attempt
const REASON_AUTH_EXPIRE: u16 = 2;
const REASON_4WAY_HANDSHAKE_TIMEOUT: u16 = 15;
const REASON_NO_AP_FOUND: u16 = 201;
const REASON_AUTH_FAIL: u16 = 202;
const REASON_ASSOC_FAIL: u16 = 203;
const REASON_HANDSHAKE_TIMEOUT: u16 = 204;
const REASON_CONNECTION_FAIL: u16 = 205;
const REASON_NO_AP_FOUND_W_COMPATIBLE_SECURITY: u16 = 210;
const REASON_NO_AP_FOUND_IN_AUTHMODE_THRESHOLD: u16 = 211;
const REASON_NO_AP_FOUND_IN_RSSI_THRESHOLD: u16 = 212;

/// Status an attempt ends in for a disconnect reason, if it ends it
fn failure_for_reason(reason: u16) -> Option<WifiStatus> {
    match reason {
        REASON_NO_AP_FOUND
        | REASON_NO_AP_FOUND_W_COMPATIBLE_SECURITY
        | REASON_NO_AP_FOUND_IN_AUTHMODE_THRESHOLD
        | REASON_NO_AP_FOUND_IN_RSSI_THRESHOLD => Some(WifiStatus::NoNetworkAvailable),
        REASON_AUTH_EXPIRE
        | REASON_4WAY_HANDSHAKE_TIMEOUT
        | REASON_AUTH_FAIL
        | REASON_ASSOC_FAIL
        | REASON_HANDSHAKE_TIMEOUT
        | REASON_CONNECTION_FAIL => Some(WifiStatus::ConnectFailed),
        _ => None,
    }
}

/// Attempt bookkeeping shared with the event loop callback
#[derive(Debug, Default)]
struct Link {
    attempting: bool,
    failure: Option<WifiStatus>,
}

pub struct StationWifi {
    wifi: EspWifi<'static>,
    link: Arc<Mutex<Link>>,
    ever_started: bool,
    _events: EspSubscription<'static, System>,
}

impl StationWifi {
    pub fn new(wifi: EspWifi<'static>, sys_loop: &EspSystemEventLoop) -> anyhow::Result<Self> {
        let link = Arc::new(Mutex::new(Link::default()));

        let event_link = link.clone();
        let events = sys_loop.subscribe::<WifiEvent, _>(move |event| {
            if let WifiEvent::StaDisconnected(disconnected) = event {
                let reason = u16::from(disconnected.reason());
                debug!("WiFi disconnected, reason {reason}");
                if let Ok(mut link) = event_link.lock() {
                    if link.attempting && link.failure.is_none() {
                        link.failure = failure_for_reason(reason);
                    }
                }
            }
        })?;

        Ok(Self {
            wifi,
            link,
            ever_started: false,
            _events: events,
        })
    }

    fn has_ip(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn reset_link(&self, attempting: bool) {
        if let Ok(mut link) = self.link.lock() {
            link.attempting = attempting;
            link.failure = None;
        }
    }
}

impl Wifi for StationWifi {
    type Error = anyhow::Error;

    fn begin(&mut self, ssid: &str, password: &str) -> anyhow::Result<()> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
            password: password
                .try_into()
                .map_err(|_| anyhow!("password too long"))?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&config)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        self.reset_link(true);
        self.wifi.connect()?;
        self.ever_started = true;
        info!("WiFi started, connecting to {ssid}...");
        Ok(())
    }

    fn disconnect(&mut self) -> anyhow::Result<()> {
        self.reset_link(false);
        if self.wifi.is_started()? {
            self.wifi.disconnect()?;
        }
        Ok(())
    }

    fn status(&self) -> WifiStatus {
        let Ok(mut link) = self.link.lock() else {
            return WifiStatus::Idle;
        };

        if self.has_ip() {
            // a later drop reads as Disconnected, not as a pending attempt
            link.attempting = false;
            link.failure = None;
            WifiStatus::Connected
        } else if link.attempting {
            link.failure.unwrap_or(WifiStatus::Connecting)
        } else if self.ever_started {
            WifiStatus::Disconnected
        } else {
            WifiStatus::Idle
        }
    }

    fn rssi(&self) -> i32 {
        let mut info = wifi_ap_record_t::default();
        match esp!(unsafe { esp_wifi_sta_get_ap_info(&mut info) }) {
            Ok(()) => i32::from(info.rssi),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_access_point_means_no_network() {
        for reason in [201, 210, 211, 212] {
            assert_eq!(failure_for_reason(reason), Some(WifiStatus::NoNetworkAvailable));
        }
    }

    #[test]
    fn authentication_problems_fail_the_attempt() {
        for reason in [2, 15, 202, 203, 204, 205] {
            assert_eq!(failure_for_reason(reason), Some(WifiStatus::ConnectFailed));
        }
    }

    #[test]
    fn other_reasons_keep_waiting() {
        // 8 ASSOC_LEAVE is our own disconnect, 200 BEACON_TIMEOUT a drop
        assert_eq!(failure_for_reason(8), None);
        assert_eq!(failure_for_reason(200), None);
    }
}
