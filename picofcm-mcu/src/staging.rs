//! Staging buffers for values written over BLE
//!
//! Each writable field keeps the last value written to it until a command
//! consumes it. A write replaces the previous value of that field only.

use std::fmt;

use log::*;
use picofcm_proto::Characteristic;
use zeroize::Zeroize;

use crate::credentials::{FcmToken, FcmUrl, Password, Ssid};

/// Most recently received value of each writable field
#[derive(Clone, Default)]
pub struct StagingBuffers {
    pub ssid: Ssid,
    pub password: Password,
    pub fcm_url: FcmUrl,
    pub fcm_token: FcmToken,
}

impl StagingBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw characteristic value in its field buffer
    ///
    /// Returns `false` when `characteristic` is not a staged field.
    pub fn write(&mut self, characteristic: Characteristic, data: &[u8]) -> bool {
        match characteristic {
            Characteristic::Ssid => {
                self.ssid.erase();
                self.ssid = Ssid::from_bytes(data);
                info!("Received SSID: {}", self.ssid);
            }
            Characteristic::Password => {
                self.password.erase();
                self.password = Password::from_bytes(data);
                info!("Received password ({} bytes)", self.password.len());
            }
            Characteristic::FcmUrl => {
                self.fcm_url.erase();
                self.fcm_url = FcmUrl::from_bytes(data);
                info!("Received FCM URL ({} bytes)", self.fcm_url.len());
            }
            Characteristic::FcmToken => {
                self.fcm_token.erase();
                self.fcm_token = FcmToken::from_bytes(data);
                info!("Received FCM token ({} bytes)", self.fcm_token.len());
            }
            Characteristic::Command | Characteristic::PairingStatus => return false,
        }
        true
    }
}

impl fmt::Debug for StagingBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingBuffers")
            .field("ssid", &self.ssid)
            .field("password", &format_args!("<{} bytes>", self.password.len()))
            .field("fcm_url", &self.fcm_url)
            .field("fcm_token", &format_args!("<{} bytes>", self.fcm_token.len()))
            .finish()
    }
}

impl Zeroize for StagingBuffers {
    fn zeroize(&mut self) {
        self.ssid.zeroize();
        self.password.zeroize();
        self.fcm_url.zeroize();
        self.fcm_token.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_independent() {
        let mut staging = StagingBuffers::new();
        staging.write(Characteristic::Ssid, b"Home");
        staging.write(Characteristic::Password, b"secret");
        staging.write(Characteristic::FcmUrl, b"https://example.com");

        assert_eq!(staging.ssid.as_str(), "Home");
        assert_eq!(staging.password.as_str(), "secret");
        assert_eq!(staging.fcm_url.as_str(), "https://example.com");
        assert!(staging.fcm_token.is_empty());
    }

    #[test]
    fn writes_overwrite_instead_of_appending() {
        let mut staging = StagingBuffers::new();
        staging.write(Characteristic::Ssid, b"LongNetworkName");
        staging.write(Characteristic::Ssid, b"Short");
        assert_eq!(staging.ssid.as_str(), "Short");

        staging.write(Characteristic::Ssid, b"");
        assert!(staging.ssid.is_empty());
    }

    #[test]
    fn writes_are_clamped_to_field_limits() {
        let mut staging = StagingBuffers::new();
        staging.write(Characteristic::Ssid, &[b'a'; 100]);
        staging.write(Characteristic::Password, &[b'b'; 100]);
        staging.write(Characteristic::FcmToken, &[b'c'; 400]);

        assert_eq!(staging.ssid.len(), 32);
        assert_eq!(staging.password.len(), 64);
        assert_eq!(staging.fcm_token.len(), 256);
    }

    #[test]
    fn non_field_characteristics_are_not_staged() {
        let mut staging = StagingBuffers::new();
        assert!(!staging.write(Characteristic::Command, &[0x01]));
        assert!(!staging.write(Characteristic::PairingStatus, &[0x01]));
        assert!(staging.ssid.is_empty());
    }
}
