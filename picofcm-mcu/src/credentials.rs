//! Credential store - stored WiFi networks and the notification endpoint
//!
//! Holds at most [`MAX_WIFI_NETWORKS`] networks in insertion order, keyed by
//! SSID, plus a single notification endpoint. The whole store is persisted as
//! one JSON record at [`CONFIG_PATH`].

use std::fmt;

use log::*;
use picofcm_proto::{
    MAX_FCM_TOKEN_LENGTH, MAX_FCM_URL_LENGTH, MAX_PASSWORD_LENGTH, MAX_SSID_LENGTH,
    MAX_WIFI_NETWORKS,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use zeroize::Zeroize;

use crate::bounded::Bounded;
use crate::error::{CredentialError, PersistenceError};
use crate::storage::{Storage, CONFIG_PATH};

pub type Ssid = Bounded<MAX_SSID_LENGTH>;
pub type Password = Bounded<MAX_PASSWORD_LENGTH>;
pub type FcmUrl = Bounded<MAX_FCM_URL_LENGTH>;
pub type FcmToken = Bounded<MAX_FCM_TOKEN_LENGTH>;

/// Stored WiFi network
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NetworkCredential {
    pub ssid: Ssid,
    pub password: Password,
    pub enabled: bool,
}

impl fmt::Debug for NetworkCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredential")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Zeroize for NetworkCredential {
    fn zeroize(&mut self) {
        self.ssid.zeroize();
        self.password.zeroize();
        self.enabled = false;
    }
}

/// Where notifications are POSTed, and the token identifying the recipient
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NotificationEndpoint {
    pub url: FcmUrl,
    pub token: FcmToken,
}

impl NotificationEndpoint {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.token.is_empty()
    }
}

impl fmt::Debug for NotificationEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationEndpoint")
            .field("url", &self.url)
            .field("token", &format_args!("<{} bytes>", self.token.len()))
            .finish()
    }
}

impl Zeroize for NotificationEndpoint {
    fn zeroize(&mut self) {
        self.url.zeroize();
        self.token.zeroize();
    }
}

/// On-disk shape of the configuration record
///
/// Reading is lenient per field: a value of the wrong type is treated as
/// absent instead of rejecting the whole record.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default, deserialize_with = "string_or_none", skip_serializing_if = "Option::is_none")]
    fcm_url: Option<String>,
    #[serde(default, deserialize_with = "string_or_none", skip_serializing_if = "Option::is_none")]
    fcm_token: Option<String>,
    #[serde(default, deserialize_with = "readable_networks")]
    networks: Vec<StoredNetwork>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredNetwork {
    #[serde(default, deserialize_with = "string_or_none")]
    ssid: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    password: Option<String>,
    #[serde(default = "enabled_by_default", deserialize_with = "bool_or_enabled")]
    enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn bool_or_enabled<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_bool()
        .unwrap_or_else(enabled_by_default))
}

/// Entries that are not objects are dropped, a non-array counts as empty
fn readable_networks<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<StoredNetwork>, D::Error> {
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl Zeroize for StoredConfig {
    fn zeroize(&mut self) {
        self.fcm_url.zeroize();
        self.fcm_token.zeroize();
        for network in &mut self.networks {
            network.ssid.zeroize();
            network.password.zeroize();
        }
    }
}

/// Bounded, ordered set of WiFi networks plus the notification endpoint
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    networks: Vec<NetworkCredential>,
    endpoint: NotificationEndpoint,
}

impl CredentialStore {
    pub const CAPACITY: usize = MAX_WIFI_NETWORKS;

    pub fn new() -> Self {
        Self {
            networks: Vec::with_capacity(Self::CAPACITY),
            endpoint: NotificationEndpoint::default(),
        }
    }

    /// Number of stored networks
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// All stored networks in insertion order
    pub fn networks(&self) -> &[NetworkCredential] {
        &self.networks
    }

    pub fn get(&self, ssid: &str) -> Option<&NetworkCredential> {
        self.networks.iter().find(|n| n.ssid.as_str() == ssid)
    }

    pub fn endpoint(&self) -> &NotificationEndpoint {
        &self.endpoint
    }

    /// Insert a network, or replace the password of the one with this SSID
    ///
    /// Updating re-enables the entry and keeps its position. Nothing is
    /// changed when the call fails.
    pub fn upsert(&mut self, ssid: &str, password: &str) -> Result<(), CredentialError> {
        if ssid.is_empty() {
            return Err(CredentialError::EmptyName);
        }

        let ssid = Ssid::new(ssid);
        let password = Password::new(password);

        if let Some(existing) = self.networks.iter_mut().find(|n| n.ssid == ssid) {
            existing.password.erase();
            existing.password = password;
            existing.enabled = true;
            return Ok(());
        }

        if self.networks.len() >= Self::CAPACITY {
            return Err(CredentialError::StoreFull {
                capacity: Self::CAPACITY,
            });
        }

        self.networks.push(NetworkCredential {
            ssid,
            password,
            enabled: true,
        });
        Ok(())
    }

    /// Enabled networks in insertion order
    pub fn enabled(&self) -> impl Iterator<Item = &NetworkCredential> + '_ {
        self.networks.iter().filter(|n| n.enabled)
    }

    /// Erase every network and the endpoint from memory
    pub fn clear(&mut self) {
        for network in &mut self.networks {
            network.zeroize();
        }
        self.networks.clear();
        self.endpoint.zeroize();
    }

    /// Erase everything in memory and delete the persisted record
    ///
    /// A missing record counts as deleted.
    pub fn clear_all<S: Storage>(&mut self, storage: &mut S) -> Result<(), PersistenceError> {
        self.clear();

        if storage.exists(CONFIG_PATH) {
            storage
                .remove(CONFIG_PATH)
                .map_err(|e| PersistenceError::Remove {
                    path: CONFIG_PATH,
                    reason: format!("{e:?}"),
                })?;
        }
        Ok(())
    }

    /// Replace the store with the persisted record
    ///
    /// Returns the number of networks loaded. Values longer than their field
    /// limit are truncated, networks past the capacity are ignored, and an
    /// entry without `enabled` counts as enabled. On error the store is left
    /// as it was.
    pub fn load<S: Storage>(&mut self, storage: &S) -> Result<usize, PersistenceError> {
        if !storage.exists(CONFIG_PATH) {
            return Err(PersistenceError::NotFound(CONFIG_PATH));
        }

        let mut data = storage
            .read(CONFIG_PATH)
            .map_err(|e| PersistenceError::Read {
                path: CONFIG_PATH,
                reason: format!("{e:?}"),
            })?;
        let parsed = serde_json::from_slice::<StoredConfig>(&data);
        data.zeroize();

        let mut record = parsed.map_err(|e| {
            warn!("Failed to parse config: {e}");
            PersistenceError::Parse(e)
        })?;

        let mut networks: Vec<NetworkCredential> = Vec::with_capacity(Self::CAPACITY);
        for stored in &record.networks {
            if networks.len() >= Self::CAPACITY {
                break;
            }
            let Some(ssid) = stored.ssid.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            let ssid = Ssid::new(ssid);
            if networks.iter().any(|n| n.ssid == ssid) {
                debug!("Skipping duplicate stored network {ssid}");
                continue;
            }
            networks.push(NetworkCredential {
                ssid,
                password: Password::new(stored.password.as_deref().unwrap_or_default()),
                enabled: stored.enabled,
            });
        }

        let endpoint = NotificationEndpoint {
            url: FcmUrl::new(record.fcm_url.as_deref().unwrap_or_default()),
            token: FcmToken::new(record.fcm_token.as_deref().unwrap_or_default()),
        };
        record.zeroize();

        self.clear();
        self.networks = networks;
        self.endpoint = endpoint;

        info!("Loaded {} networks from storage", self.networks.len());
        Ok(self.networks.len())
    }

    /// Persist the networks together with the staged endpoint fields
    ///
    /// An empty staged field keeps the endpoint value already held. After a
    /// successful write the in-memory endpoint takes the non-empty staged
    /// values. On error neither the record nor memory changes.
    pub fn save<S: Storage>(
        &mut self,
        storage: &mut S,
        pending_url: &str,
        pending_token: &str,
    ) -> Result<(), PersistenceError> {
        let pending_url = FcmUrl::new(pending_url);
        let pending_token = FcmToken::new(pending_token);

        let url = if pending_url.is_empty() {
            &self.endpoint.url
        } else {
            &pending_url
        };
        let token = if pending_token.is_empty() {
            &self.endpoint.token
        } else {
            &pending_token
        };

        let mut record = StoredConfig {
            fcm_url: non_empty(url.as_str()),
            fcm_token: non_empty(token.as_str()),
            networks: self
                .networks
                .iter()
                .map(|n| StoredNetwork {
                    ssid: Some(n.ssid.to_string()),
                    password: Some(n.password.to_string()),
                    enabled: n.enabled,
                })
                .collect(),
        };

        let serialized = serde_json::to_vec(&record);
        record.zeroize();
        let mut data = serialized.map_err(PersistenceError::Serialize)?;

        let written = storage.write(CONFIG_PATH, &data);
        data.zeroize();
        written.map_err(|e| PersistenceError::Write {
            path: CONFIG_PATH,
            reason: format!("{e:?}"),
        })?;

        if !pending_url.is_empty() {
            self.endpoint.url = pending_url;
        }
        if !pending_token.is_empty() {
            self.endpoint.token = pending_token;
        }

        info!("Configuration saved to storage");
        Ok(())
    }
}
