//! Provisioning state machine
//!
//! Tracks where the device is in bringing WiFi up and owns the connection
//! timeout. Observers see every committed change exactly once.

use std::fmt;

use log::*;

use crate::error::ConnectError;
use crate::wifi::WifiStatus;

/// How long a connection attempt may stay in `Connecting`
pub const CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Lifecycle of the provisioning process
///
/// Discriminants match the status values reported to applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProvisioningStatus {
    Idle = 0,
    Started = 1,
    Failed = 3,
    Connecting = 4,
    Connected = 5,
}

impl ProvisioningStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningStatus::Idle => "idle",
            ProvisioningStatus::Started => "started",
            ProvisioningStatus::Failed => "failed",
            ProvisioningStatus::Connecting => "connecting",
            ProvisioningStatus::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Result of one [`StateMachine::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No attempt in progress, nothing checked
    NotConnecting,
    /// Still waiting on the network stack
    Pending,
    /// Moved to `Connected`
    Connected,
    /// Moved to `Failed` because the stack reported this status
    Rejected(WifiStatus),
    /// Moved to `Failed` because the attempt ran out of time; the caller
    /// must tear the attempt down
    TimedOut,
}

type StatusCallback = Box<dyn FnMut(ProvisioningStatus)>;

/// Provisioning status plus the timer of the current connection attempt
pub struct StateMachine {
    status: ProvisioningStatus,
    attempt_started_at: Option<u64>,
    callback: Option<StatusCallback>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            status: ProvisioningStatus::Idle,
            attempt_started_at: None,
            callback: None,
        }
    }

    pub fn status(&self) -> ProvisioningStatus {
        self.status
    }

    /// When the current attempt began, while `Connecting`
    pub fn attempt_started_at(&self) -> Option<u64> {
        self.attempt_started_at
    }

    /// Register the status observer, replacing any previous one
    pub fn set_callback(&mut self, callback: impl FnMut(ProvisioningStatus) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Move to `status`
    ///
    /// Returns `false` without notifying anyone when already there.
    pub fn set(&mut self, status: ProvisioningStatus) -> bool {
        if self.status == status {
            return false;
        }

        debug!("Provisioning status: {} -> {}", self.status, status);
        self.status = status;
        if status != ProvisioningStatus::Connecting {
            self.attempt_started_at = None;
        }
        if let Some(callback) = self.callback.as_mut() {
            callback(status);
        }
        true
    }

    /// Enter `Connecting` and start the attempt timer at `now_ms`
    pub fn begin_connection_attempt(&mut self, now_ms: u64) -> Result<(), ConnectError> {
        if self.status == ProvisioningStatus::Connecting {
            return Err(ConnectError::AlreadyConnecting);
        }
        self.attempt_started_at = Some(now_ms);
        self.set(ProvisioningStatus::Connecting);
        Ok(())
    }

    /// Restart the timer of the pending attempt at `now_ms`
    ///
    /// Does nothing unless `Connecting`.
    pub fn restart_attempt_timer(&mut self, now_ms: u64) {
        if self.status == ProvisioningStatus::Connecting {
            self.attempt_started_at = Some(now_ms);
        }
    }

    /// Advance a pending attempt from the current WiFi status
    ///
    /// At most one transition happens per call. A status reported by the
    /// stack wins over the timeout when both apply.
    pub fn poll(&mut self, wifi: WifiStatus, now_ms: u64) -> PollOutcome {
        if self.status != ProvisioningStatus::Connecting {
            return PollOutcome::NotConnecting;
        }

        if wifi == WifiStatus::Connected {
            self.set(ProvisioningStatus::Connected);
            return PollOutcome::Connected;
        }

        if wifi.is_failure() {
            self.set(ProvisioningStatus::Failed);
            return PollOutcome::Rejected(wifi);
        }

        // entered through set() without a timer: it starts with this poll
        let started = *self.attempt_started_at.get_or_insert(now_ms);
        if now_ms.saturating_sub(started) >= CONNECT_TIMEOUT_MS {
            self.set(ProvisioningStatus::Failed);
            return PollOutcome::TimedOut;
        }

        PollOutcome::Pending
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("status", &self.status)
            .field("attempt_started_at", &self.attempt_started_at)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
