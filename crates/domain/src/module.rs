//! Module catalog — the 3-character type prefixes a gateway reports.
//!
//! Every status and inventory line starts with a module code (`IS8`, `BU4`,
//! `DIM`, …). The code fixes how many channels the module has and what kind
//! of device each channel becomes.

use std::fmt;

use crate::device::DeviceKind;

/// Module types the decoder knows how to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleType {
    /// 8-channel input module.
    Is8,
    /// 4-channel input module.
    Is4,
    /// Single-channel detector.
    Det,
    /// Push button with 1 input and 1 output.
    Bu1,
    /// Push button with 2 inputs and 2 outputs.
    Bu2,
    /// Push button with 4 inputs and 4 outputs.
    Bu4,
    /// Push button with 6 inputs and 6 outputs.
    Bu6,
    /// 8-channel bistable relay.
    Bir,
    /// 5-channel monostable relay.
    Dmr,
    /// 8-channel dimmer.
    Dim,
    /// Audio amplifier, one record per zone.
    Amp,
    /// Gateway variable (administrative, no state).
    Var,
    /// System telemetry (no state).
    Sys,
    /// Sound/feedback frames echoed by the gateway (no state).
    Sfe,
}

/// How a module's status payload maps onto device records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleClass {
    /// Hex bitmask of input channels.
    Inputs,
    /// Hex bitmask of output channels.
    Outputs,
    /// Inputs on type `I` frames, outputs (shifted channel range) otherwise.
    PushButton,
    /// One hex byte pair per channel.
    Dimmer,
    /// Free-text zone payload.
    Amplifier,
    /// Recognised but carries no device state.
    Administrative,
}

impl ModuleType {
    /// Look up a module by its 3-character code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let module = match code {
            "IS8" => Self::Is8,
            "IS4" => Self::Is4,
            "DET" => Self::Det,
            "BU1" => Self::Bu1,
            "BU2" => Self::Bu2,
            "BU4" => Self::Bu4,
            "BU6" => Self::Bu6,
            "BIR" => Self::Bir,
            "DMR" => Self::Dmr,
            "DIM" => Self::Dim,
            "AMP" => Self::Amp,
            "VAR" => Self::Var,
            "SYS" => Self::Sys,
            "SFE" => Self::Sfe,
            _ => return None,
        };
        Some(module)
    }

    /// The wire code of this module.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Is8 => "IS8",
            Self::Is4 => "IS4",
            Self::Det => "DET",
            Self::Bu1 => "BU1",
            Self::Bu2 => "BU2",
            Self::Bu4 => "BU4",
            Self::Bu6 => "BU6",
            Self::Bir => "BIR",
            Self::Dmr => "DMR",
            Self::Dim => "DIM",
            Self::Amp => "AMP",
            Self::Var => "VAR",
            Self::Sys => "SYS",
            Self::Sfe => "SFE",
        }
    }

    #[must_use]
    pub fn class(self) -> ModuleClass {
        match self {
            Self::Is8 | Self::Is4 | Self::Det => ModuleClass::Inputs,
            Self::Bu1 | Self::Bu2 | Self::Bu4 | Self::Bu6 => ModuleClass::PushButton,
            Self::Bir | Self::Dmr => ModuleClass::Outputs,
            Self::Dim => ModuleClass::Dimmer,
            Self::Amp => ModuleClass::Amplifier,
            Self::Var | Self::Sys | Self::Sfe => ModuleClass::Administrative,
        }
    }

    /// Number of channels of this module.
    ///
    /// For push buttons this is the number of inputs, which equals the
    /// number of outputs; output channels are numbered `N+1..=2N`.
    #[must_use]
    pub fn channel_count(self) -> u8 {
        match self {
            Self::Is8 | Self::Bir | Self::Dim => 8,
            Self::Is4 | Self::Bu4 => 4,
            Self::Bu6 => 6,
            Self::Dmr => 5,
            Self::Bu2 => 2,
            Self::Det | Self::Bu1 => 1,
            Self::Amp | Self::Var | Self::Sys | Self::Sfe => 0,
        }
    }

    /// Whether inventory lines for this module describe a device.
    #[must_use]
    pub fn has_inventory(self) -> bool {
        !matches!(self.class(), ModuleClass::Administrative)
    }

    /// Kind of the device described by an inventory line with the given
    /// channel suffix character.
    ///
    /// Push-button channels above the module's input count are outputs.
    /// Returns `None` for administrative modules, or when a push-button
    /// suffix is not a hex digit.
    #[must_use]
    pub fn inventory_kind(self, suffix: char) -> Option<DeviceKind> {
        match self.class() {
            ModuleClass::Inputs => Some(DeviceKind::Input),
            ModuleClass::Outputs | ModuleClass::Dimmer => Some(DeviceKind::Output),
            ModuleClass::Amplifier => Some(DeviceKind::Amplifier),
            ModuleClass::PushButton => {
                let channel = suffix.to_digit(16)?;
                if channel > u32::from(self.channel_count()) {
                    Some(DeviceKind::Output)
                } else {
                    Some(DeviceKind::Input)
                }
            }
            ModuleClass::Administrative => None,
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
