//! Snapshot encoding, chosen from the file extension.

use std::path::Path;

use domintell_domain::device::Device;

use crate::error::StorageError;

/// On-disk encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Compact binary (`.bin`).
    Postcard,
    /// Human-readable text (`.json`).
    Json,
}

impl SnapshotFormat {
    /// Pick the format matching the extension of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedExtension`] for anything but
    /// `.bin` and `.json`.
    pub fn from_path(path: &Path) -> Result<Self, StorageError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match extension {
            "bin" => Ok(Self::Postcard),
            "json" => Ok(Self::Json),
            other => Err(StorageError::UnsupportedExtension {
                extension: other.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Postcard => "bin",
            Self::Json => "json",
        }
    }

    /// # Errors
    ///
    /// Returns the codec error if a record cannot be encoded.
    pub fn encode(self, devices: &[Device]) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::Postcard => Ok(postcard::to_allocvec(devices)?),
            Self::Json => Ok(serde_json::to_vec_pretty(devices)?),
        }
    }

    /// # Errors
    ///
    /// Returns the codec error if `bytes` is not a valid snapshot.
    pub fn decode(self, bytes: &[u8]) -> Result<Vec<Device>, StorageError> {
        match self {
            Self::Postcard => Ok(postcard::from_bytes(bytes)?),
            Self::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }
}
