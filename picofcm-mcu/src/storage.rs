//! Persistent Storage Abstraction Traits
//!
//! The core keeps a single configuration record at
//! [`CONFIG_PATH`](picofcm_proto::CONFIG_PATH). Backends map the path onto
//! whatever they have: a LittleFS file, an NVS key, a host file.

use std::fmt;

pub use picofcm_proto::CONFIG_PATH;

/// Trait for durable record storage
///
/// MCU-specific crates implement this trait using their storage backend.
/// `write` must either replace the whole record or fail without touching it.
pub trait Storage {
    /// Error type for storage operations
    type Error: fmt::Debug;

    /// Check whether a record exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Read the whole record at `path`
    fn read(&self, path: &str) -> Result<Vec<u8>, Self::Error>;

    /// Replace the record at `path`
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Delete the record at `path`
    fn remove(&mut self, path: &str) -> Result<(), Self::Error>;
}
