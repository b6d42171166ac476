//! Error types for the provisioning core

/// Rejected credential store update
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("network name must not be empty")]
    EmptyName,
    #[error("credential store is full ({capacity} networks)")]
    StoreFull { capacity: usize },
}

/// Failure reading or writing the configuration record
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("no stored configuration at {0}")]
    NotFound(&'static str),
    #[error("failed to read {path}: {reason}")]
    Read { path: &'static str, reason: String },
    #[error("failed to parse stored configuration: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write {path}: {reason}")]
    Write { path: &'static str, reason: String },
    #[error("failed to remove {path}: {reason}")]
    Remove { path: &'static str, reason: String },
}

/// Connection attempt that could not be started
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("SSID is empty")]
    EmptyName,
    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,
    #[error("already connected")]
    AlreadyConnected,
    #[error("no enabled networks stored")]
    NoStoredNetworks,
    #[error("WiFi stack refused to start connecting: {0}")]
    Begin(String),
}

/// Notification that was not delivered
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("WiFi not connected")]
    NotConnected,
    #[error("notification URL or token not configured")]
    NotConfigured,
    #[error("failed to serialize notification: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("error sending notification: {0}")]
    TransportFailure(String),
    #[error("notification endpoint returned HTTP {0}")]
    HttpStatus(u16),
}
