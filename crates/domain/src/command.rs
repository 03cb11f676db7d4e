//! Command — a line the client sends to the gateway.

use std::fmt;

use crate::device::{Device, DeviceValue};
use crate::error::CommandError;
use crate::id::DeviceId;
use crate::module::{ModuleClass, ModuleType};

/// Outgoing gateway command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a session.
    Login,
    /// Request the inventory dump.
    AppInfo,
    /// Keepalive.
    Ping,
    /// Switch an output channel.
    Switch {
        /// Gateway address of the channel (already translated for push buttons).
        target: String,
        on: bool,
    },
}

impl Command {
    /// Build the command that drives `device` to `value`.
    ///
    /// Push-button outputs are stored under channel `N+k` but addressed on
    /// the wire as channel `k`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotAnOutput`] if `device` is not an output.
    pub fn switch(device: &Device, value: &DeviceValue) -> Result<Self, CommandError> {
        if !device.is_output() {
            return Err(CommandError::NotAnOutput {
                id: device.id.clone(),
                kind: device.kind,
            });
        }
        Ok(Self::Switch {
            target: wire_target(&device.id),
            on: value.is_on(),
        })
    }
}

fn wire_target(id: &DeviceId) -> String {
    let raw = id.as_str();
    let push_button = id
        .module_code()
        .and_then(ModuleType::from_code)
        .filter(|module| module.class() == ModuleClass::PushButton);
    if let Some(module) = push_button {
        let inputs = u32::from(module.channel_count());
        let channel = id.channel_suffix().and_then(|c| c.to_digit(16));
        if let (Some(prefix), Some(channel)) = (raw.get(..10), channel)
            && channel > inputs
        {
            return format!("{prefix}{}", channel - inputs);
        }
    }
    raw.to_string()
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("LOGIN"),
            Self::AppInfo => f.write_str("APPINFO"),
            Self::Ping => f.write_str("PING"),
            Self::Switch { target, on: true } => write!(f, "{target}%I"),
            Self::Switch { target, on: false } => write!(f, "{target}%O"),
        }
    }
}
