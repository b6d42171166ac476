//! BLE command interpreter
//!
//! A command byte acts on whatever is currently staged. Commands run to
//! completion as they arrive; failures are logged and never reported back
//! over BLE.

use log::*;
use picofcm_proto::Command;

use crate::ble::BleTransport;
use crate::clock::Clock;
use crate::provisioner::Provisioner;
use crate::state::ProvisioningStatus;
use crate::storage::Storage;
use crate::wifi::Wifi;

impl<W, B, S, C> Provisioner<W, B, S, C>
where
    W: Wifi,
    B: BleTransport,
    S: Storage,
    C: Clock,
{
    /// Execute a command byte written to the command characteristic
    pub fn process_command(&mut self, byte: u8) {
        info!("Received command: 0x{byte:02x}");

        let Some(command) = Command::from_byte(byte) else {
            warn!("Unknown command: 0x{byte:02x}");
            return;
        };

        match command {
            Command::SaveNetwork => self.save_staged_network(),
            Command::Connect => self.connect_staged_network(),
            Command::ClearNetworks => match self.clear_networks() {
                Ok(()) => info!("All config cleared"),
                Err(e) => error!("Failed to clear config: {e}"),
            },
            Command::Disconnect => {
                if let Err(e) = self.wifi.disconnect() {
                    warn!("WiFi disconnect failed: {e:?}");
                }
                self.machine.set(ProvisioningStatus::Idle);
                info!("WiFi disconnect command processed");
            }
            Command::GetStatus | Command::StartScan | Command::GetScanResults => {
                debug!("Command {command:?} has no effect on the device");
            }
        }
    }

    fn save_staged_network(&mut self) {
        if self.staging.ssid.is_empty() {
            warn!("Save requested without an SSID");
            return;
        }

        // the record is written even when the network did not fit, so that
        // staged endpoint fields still reach storage
        if let Err(e) = self
            .store
            .upsert(self.staging.ssid.as_str(), self.staging.password.as_str())
        {
            warn!("Network {} not saved: {e}", self.staging.ssid);
        }
        if let Err(e) = self.save_config() {
            error!("Failed to save config: {e}");
        }
    }

    fn connect_staged_network(&mut self) {
        let result = if self.staging.ssid.is_empty() {
            self.connect_to_stored_networks()
        } else {
            let ssid = self.staging.ssid.clone();
            let password = self.staging.password.clone();
            self.connect_to_network(ssid.as_str(), password.as_str())
        };

        if let Err(e) = result {
            warn!("Connect command ignored: {e}");
        }
    }
}
