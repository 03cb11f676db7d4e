//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors. Failures behind a port
//! (snapshot stores, listeners) cross it as [`DomintellError`].

use crate::device::DeviceKind;
use crate::id::DeviceId;

/// Error returned by port implementations.
#[derive(Debug, thiserror::Error)]
pub enum DomintellError {
    /// A persistence backend failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Why a received line was rejected by the frame decoder.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A numeric field was not valid hexadecimal.
    #[error("invalid hex field {field:?}")]
    InvalidHex {
        /// The offending text.
        field: String,
    },

    /// The line is shorter than its frame class requires.
    #[error("frame too short: expected at least {expected} characters, got {actual}")]
    Truncated {
        /// Minimum length for this frame class.
        expected: usize,
        /// Actual length of the line.
        actual: usize,
    },
}

/// Why a `set_value` request was not applied.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No record with this id exists.
    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    /// The record exists but cannot be driven.
    #[error("device {id} is an {kind}, not an output")]
    NotAnOutput {
        /// The device addressed.
        id: DeviceId,
        /// Its actual kind.
        kind: DeviceKind,
    },

    /// There is no open session with the gateway.
    #[error("gateway not connected")]
    NotConnected,

    /// The datagram could not be written.
    #[error("failed to send command")]
    Send(#[source] std::io::Error),
}
