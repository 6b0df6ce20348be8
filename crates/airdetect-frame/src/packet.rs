//! Packet type codes.
//!
//! A single code announces the device (handshake); a small inclusive range
//! carries measurements. Everything else is dropped by the receiver.

/// Connect frame binding the connection to a device identity.
pub const HANDSHAKE: u8 = 0x03;

/// First measurement type code.
pub const READING_FIRST: u8 = 0x4e;

/// Last measurement type code (inclusive).
pub const READING_LAST: u8 = 0x50;

/// Classification of a frame's type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Handshake,
    Reading(u8),
    Unrecognized(u8),
}

impl PacketKind {
    /// Classify a raw type code.
    pub fn from_code(code: u8) -> Self {
        match code {
            HANDSHAKE => PacketKind::Handshake,
            READING_FIRST..=READING_LAST => PacketKind::Reading(code),
            other => PacketKind::Unrecognized(other),
        }
    }

    /// Returns true for measurement frames.
    pub fn is_reading(self) -> bool {
        matches!(self, PacketKind::Reading(_))
    }
}

/// Returns a human-readable name for a type code.
pub fn kind_name(code: u8) -> &'static str {
    match PacketKind::from_code(code) {
        PacketKind::Handshake => "HANDSHAKE",
        PacketKind::Reading(_) => "READING",
        PacketKind::Unrecognized(_) => "UNKNOWN",
    }
}
