//! Typed device identifier.
//!
//! Ids follow the gateway's own addressing: `<module><serial>-<suffix>`,
//! e.g. `IS8001A2B-3` or `BU4000012-A`. The single clock record uses the
//! literal id `clock`.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of the clock record.
pub const CLOCK_ID: &str = "clock";

/// Unique identifier for a [`Device`](crate::device::Device).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Build the id of one channel of a module.
    ///
    /// Spaces in the serial are normalised to `0`, as the gateway pads
    /// serials with spaces in status frames but not everywhere else.
    #[must_use]
    pub fn channel(module: &str, serial: &str, suffix: impl fmt::Display) -> Self {
        Self(format!("{module}{}-{suffix}", normalize(serial)))
    }

    /// The id of the gateway clock record.
    #[must_use]
    pub fn clock() -> Self {
        Self(CLOCK_ID.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 3-character module code prefix, if the id has one.
    #[must_use]
    pub fn module_code(&self) -> Option<&str> {
        self.0.get(..3)
    }

    /// The channel suffix character that follows `<module><serial>-`.
    #[must_use]
    pub fn channel_suffix(&self) -> Option<char> {
        self.0.get(10..).and_then(|rest| rest.chars().next())
    }
}

/// Replace the gateway's space padding with `0`.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.replace(' ', "0")
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for DeviceId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
