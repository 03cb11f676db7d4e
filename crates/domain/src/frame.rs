//! Frame decoder — turns one received line into typed device updates.
//!
//! Pure functions over `&str` with no I/O. The caller applies the returned
//! [`Frame`] to its sensor store and sends [`Frame::reply`] back to the
//! gateway when there is one.
//!
//! Lines are classified in this order:
//!
//! | Class | Shape | Result |
//! |-------|-------|--------|
//! | keepalive reply | `PONG` | [`Frame::Pong`] |
//! | status | `MMMSSSSSST…` (module, serial, type) | [`Frame::Status`] / [`Frame::UnknownModule`] |
//! | clock | `HH:MM DD/MM/YY` | [`Frame::Status`] with the `clock` record |
//! | inventory | known module prefix, not a status frame | [`Frame::Inventory`] |
//! | end of inventory | `END APPINFO` | [`Frame::EndOfInventory`] |
//! | administrative | `STA`, `APPINFO`, `SFE`, … | [`Frame::Ignored`] |
//! | anything else | | [`Frame::Unrecognized`] |

use crate::command::Command;
use crate::device::{DeviceKind, DeviceValue};
use crate::error::DecodeError;
use crate::id::{DeviceId, normalize};
use crate::module::{ModuleClass, ModuleType};

/// Reply sent by the gateway when a `LOGIN` is accepted.
pub const SESSION_OPENED: &str = "INFO:Session opened:INFO";

/// Prefixes of non-status lines that carry nothing for us.
const IGNORED_PREFIXES: [&str; 7] = ["STA", "APPINFO", "SFE", "ET2", "VAR", "SYS", "MEM"];

const STATUS_HEADER_LEN: usize = 10;
const INVENTORY_ID_LEN: usize = 11;
const AMP_VALUE_OFFSET: usize = 12;

/// New value decoded for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: DeviceId,
    /// Kind to give the record if it does not exist yet.
    pub kind: DeviceKind,
    pub value: DeviceValue,
}

/// Description of one device from the `APPINFO` dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub id: DeviceId,
    /// Kind to give the record if it does not exist yet.
    pub kind: DeviceKind,
    pub description: String,
}

/// A decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Keepalive reply.
    Pong,
    /// Device values, one per channel of the reporting module.
    Status(Vec<StatusUpdate>),
    /// A device label from the inventory dump.
    Inventory(InventoryEntry),
    /// The inventory dump is complete.
    EndOfInventory,
    /// Recognised, but without any device state.
    Ignored,
    /// A well-formed status frame from a module we do not model.
    UnknownModule(String),
    /// Not a frame we know.
    Unrecognized,
}

impl Frame {
    /// Command the client must send in response, if any.
    #[must_use]
    pub fn reply(&self) -> Option<Command> {
        match self {
            Self::EndOfInventory => Some(Command::Ping),
            _ => None,
        }
    }
}

/// Decode one line as received from the gateway.
///
/// A trailing `\r`/`\n` is ignored for classification. The clock record
/// keeps the raw line, terminator included, as its value.
///
/// # Errors
///
/// Returns [`DecodeError`] when the line has the shape of a known frame
/// but a numeric field is malformed or the line is too short. The whole
/// line is rejected; no partial update is produced.
pub fn decode(raw: &str) -> Result<Frame, DecodeError> {
    let line = strip_terminator(raw);

    if line.is_empty() {
        return Ok(Frame::Ignored);
    }
    if line == "PONG" {
        return Ok(Frame::Pong);
    }
    if let Some(header) = StatusHeader::parse(line) {
        return decode_status(&header);
    }
    if is_clock(raw) {
        return Ok(Frame::Status(vec![StatusUpdate {
            id: DeviceId::clock(),
            kind: DeviceKind::Clock,
            value: DeviceValue::Text(raw.to_string()),
        }]));
    }
    if let Some(module) = line
        .get(..3)
        .and_then(ModuleType::from_code)
        .filter(|module| module.has_inventory())
    {
        return decode_inventory(module, line).map(Frame::Inventory);
    }
    if line.starts_with("END APPINFO") {
        return Ok(Frame::EndOfInventory);
    }
    if IGNORED_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        return Ok(Frame::Ignored);
    }
    Ok(Frame::Unrecognized)
}

fn strip_terminator(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}

/// The fixed-width head of a status frame.
struct StatusHeader<'a> {
    module: &'a str,
    serial: &'a str,
    frame_type: u8,
    payload: &'a str,
}

impl<'a> StatusHeader<'a> {
    /// Match `[A-Z0-9]{3}[A-F0-9 ]{6}[IODTCSB]` at the start of the line.
    fn parse(line: &'a str) -> Option<Self> {
        let bytes = line.as_bytes();
        if bytes.len() < STATUS_HEADER_LEN {
            return None;
        }
        let module_ok = bytes[..3]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        let serial_ok = bytes[3..9]
            .iter()
            .all(|b| matches!(b, b'A'..=b'F' | b'0'..=b'9' | b' '));
        let type_ok = b"IODTCSB".contains(&bytes[9]);
        if !(module_ok && serial_ok && type_ok) {
            return None;
        }
        // The first ten bytes are ASCII, so these are char boundaries.
        Some(Self {
            module: &line[..3],
            serial: &line[3..9],
            frame_type: bytes[9],
            payload: &line[STATUS_HEADER_LEN..],
        })
    }
}

fn decode_status(header: &StatusHeader<'_>) -> Result<Frame, DecodeError> {
    let Some(module) = ModuleType::from_code(header.module) else {
        return Ok(Frame::UnknownModule(header.module.to_string()));
    };
    let count = module.channel_count();

    let updates = match module.class() {
        ModuleClass::Inputs => decode_bits(header, 1..=count, 0, DeviceKind::Input, false)?,
        ModuleClass::PushButton if header.frame_type == b'I' => {
            decode_bits(header, 1..=count, 0, DeviceKind::Input, false)?
        }
        ModuleClass::PushButton => {
            decode_bits(header, count + 1..=2 * count, count, DeviceKind::Output, true)?
        }
        ModuleClass::Outputs => decode_bits(header, 1..=count, 0, DeviceKind::Output, false)?,
        ModuleClass::Dimmer => decode_levels(header, count)?,
        ModuleClass::Amplifier => vec![decode_amplifier(header)?],
        ModuleClass::Administrative => return Ok(Frame::Ignored),
    };
    Ok(Frame::Status(updates))
}

/// One on/off record per channel, read from a hex bitmask.
///
/// Channel `c` maps to bit `c - offset - 1`. With `hex_suffix` the channel
/// number is rendered in uppercase hex in the id (push-button outputs run
/// past 9).
fn decode_bits(
    header: &StatusHeader<'_>,
    channels: std::ops::RangeInclusive<u8>,
    offset: u8,
    kind: DeviceKind,
    hex_suffix: bool,
) -> Result<Vec<StatusUpdate>, DecodeError> {
    let mask = parse_hex_mask(header.payload)?;
    let updates = channels
        .map(|channel| {
            let id = if hex_suffix {
                DeviceId::channel(header.module, header.serial, format_args!("{channel:X}"))
            } else {
                DeviceId::channel(header.module, header.serial, channel)
            };
            let bit = channel - offset - 1;
            StatusUpdate {
                id,
                kind,
                value: DeviceValue::Switch(mask & (1 << bit) != 0),
            }
        })
        .collect();
    Ok(updates)
}

/// One level per channel, two hex digits each.
fn decode_levels(header: &StatusHeader<'_>, count: u8) -> Result<Vec<StatusUpdate>, DecodeError> {
    let payload = normalize(header.payload);
    let mut updates = Vec::with_capacity(usize::from(count));
    for channel in 1..=count {
        let start = usize::from(channel - 1) * 2;
        let end = (start + 2).min(payload.len());
        let field = payload.get(start..end).unwrap_or_default();
        let level = u8::from_str_radix(field, 16).map_err(|_| DecodeError::InvalidHex {
            field: field.to_string(),
        })?;
        updates.push(StatusUpdate {
            id: DeviceId::channel(header.module, header.serial, channel),
            kind: DeviceKind::Output,
            value: DeviceValue::Level(level),
        });
    }
    Ok(updates)
}

/// Zone letter right after the frame type, free text after a separator.
fn decode_amplifier(header: &StatusHeader<'_>) -> Result<StatusUpdate, DecodeError> {
    let Some(zone) = header.payload.chars().next() else {
        return Err(DecodeError::Truncated {
            expected: STATUS_HEADER_LEN + 1,
            actual: STATUS_HEADER_LEN,
        });
    };
    let text = header
        .payload
        .get(AMP_VALUE_OFFSET - STATUS_HEADER_LEN..)
        .unwrap_or_default();
    Ok(StatusUpdate {
        id: DeviceId::channel(header.module, header.serial, zone),
        kind: DeviceKind::Amplifier,
        value: DeviceValue::Text(text.to_string()),
    })
}

fn parse_hex_mask(payload: &str) -> Result<u64, DecodeError> {
    u64::from_str_radix(payload.trim(), 16).map_err(|_| DecodeError::InvalidHex {
        field: payload.to_string(),
    })
}

/// Match `[0-9]{2}:[0-9 ]{2} [0-9]{2}/[0-9]{2}/[0-9]{2}\r` at the start of
/// the raw line.
fn is_clock(raw: &str) -> bool {
    const PATTERN: &[u8] = b"00:__ 00/00/00\r";
    let bytes = raw.as_bytes();
    if bytes.len() < PATTERN.len() {
        return false;
    }
    PATTERN.iter().zip(bytes).all(|(pattern, byte)| match pattern {
        b'0' => byte.is_ascii_digit(),
        b'_' => byte.is_ascii_digit() || *byte == b' ',
        literal => literal == byte,
    })
}

fn decode_inventory(module: ModuleType, line: &str) -> Result<InventoryEntry, DecodeError> {
    let (head, rest) = match (line.get(..INVENTORY_ID_LEN), line.get(INVENTORY_ID_LEN..)) {
        (Some(head), Some(rest)) => (head, rest),
        _ => {
            return Err(DecodeError::Truncated {
                expected: INVENTORY_ID_LEN,
                actual: line.len(),
            });
        }
    };
    let suffix = head.chars().last().unwrap_or_default();
    let kind = module
        .inventory_kind(suffix)
        .ok_or_else(|| DecodeError::InvalidHex {
            field: suffix.to_string(),
        })?;
    let description = rest.split('[').next().unwrap_or_default();

    Ok(InventoryEntry {
        id: DeviceId::from(normalize(head)),
        kind,
        description: description.to_string(),
    })
}
