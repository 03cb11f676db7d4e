//! Device — one addressable channel behind the gateway.
//!
//! A device record is created the first time a status or inventory frame
//! mentions its id and lives for the rest of the process. Its kind is fixed
//! at creation; only the value and the description ever change.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// UTC timestamp of the last value change.
pub type Timestamp = DateTime<Utc>;

/// What a device record models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Input,
    Output,
    Amplifier,
    Clock,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
            Self::Amplifier => f.write_str("amplifier"),
            Self::Clock => f.write_str("clock"),
        }
    }
}

/// Current state of a device.
///
/// Records start out [`Unset`](Self::Unset) until a status frame is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceValue {
    #[default]
    Unset,
    /// On/off state of an input or relay output.
    Switch(bool),
    /// Dimmer level, 0–255.
    Level(u8),
    /// Free text (amplifier zones, clock).
    Text(String),
}

impl DeviceValue {
    /// Whether this value requests an output to be switched on.
    ///
    /// Matches the gateway client convention: `on` for a true switch, the
    /// numeric value `1`, or the literal string `"on"`.
    #[must_use]
    pub fn is_on(&self) -> bool {
        match self {
            Self::Switch(on) => *on,
            Self::Level(level) => *level == 1,
            Self::Text(text) => text == "on",
            Self::Unset => false,
        }
    }
}

impl fmt::Display for DeviceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => Ok(()),
            Self::Switch(true) => f.write_str("on"),
            Self::Switch(false) => f.write_str("off"),
            Self::Level(level) => level.fmt(f),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<bool> for DeviceValue {
    fn from(on: bool) -> Self {
        Self::Switch(on)
    }
}

impl From<u8> for DeviceValue {
    fn from(level: u8) -> Self {
        Self::Level(level)
    }
}

impl From<&str> for DeviceValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for DeviceValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A device record as held by the sensor store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub kind: DeviceKind,
    /// Label from the gateway inventory; empty until one is received.
    pub description: String,
    pub value: DeviceValue,
    /// When [`value`](Self::value) last changed.
    pub last_changed: Option<Timestamp>,
}

impl Device {
    /// Create a record with no value yet.
    #[must_use]
    pub fn new(id: DeviceId, kind: DeviceKind, description: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            description: description.into(),
            value: DeviceValue::Unset,
            last_changed: None,
        }
    }

    /// Replace the value, returning `true` when it actually changed.
    ///
    /// Re-applying the current value is a no-op and leaves
    /// [`last_changed`](Self::last_changed) untouched.
    pub fn update_value(&mut self, value: DeviceValue, ts: Timestamp) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.last_changed = Some(ts);
        true
    }

    /// Replace the description, returning `true` when it actually changed.
    pub fn update_description(&mut self, description: &str) -> bool {
        if self.description == description {
            return false;
        }
        self.description = description.to_string();
        true
    }

    #[must_use]
    pub fn is_output(&self) -> bool {
        self.kind == DeviceKind::Output
    }
}
