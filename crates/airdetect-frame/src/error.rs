/// The frame could not be delimited or its envelope is malformed.
///
/// Every variant is terminal for the connection it was read from.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The trailing six bytes are not the magic trailer.
    #[error("invalid frame trailer (expected ff23454e4423), got {0:02x?}")]
    BadTrailer(Vec<u8>),

    /// The frame is too short to hold its header and trailer.
    #[error("frame too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// No trailer was found within the maximum frame length.
    #[error("no frame trailer within {max} bytes ({len} buffered)")]
    Oversized { len: usize, max: usize },

    /// The frame holds more than one body, so the trailer of an earlier
    /// frame was lost and two frames were read as one.
    #[error("frame type 0x{type_code:02x} carries {extra} bytes past its body ({len} bytes total)")]
    Concatenated {
        type_code: u8,
        len: usize,
        extra: usize,
    },

    /// The stream ended part way through a frame.
    #[error("connection closed mid-frame ({0} bytes buffered)")]
    Incomplete(usize),

    /// An I/O error occurred while reading frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single payload field that failed numeric conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// JSON field name as sent by the device.
    pub field: &'static str,
    /// The raw string value.
    pub value: String,
    /// Why conversion failed.
    pub reason: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={:?} ({})", self.field, self.value, self.reason)
    }
}

/// The payload of a reading frame could not be turned into a [`Reading`](crate::Reading).
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The payload is not a JSON object with the expected string fields.
    #[error("malformed reading payload: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more fields are not valid numbers. All failing fields are
    /// reported, in payload field order.
    #[error("invalid reading fields: {}", format_fields(.0))]
    InvalidFields(Vec<FieldError>),
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Classified failure from decoding one frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Envelope-level failure.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// The type code is neither a handshake nor a reading.
    #[error("unrecognized packet type 0x{type_code:02x} (len {len})")]
    UnrecognizedType { type_code: u8, len: usize },

    /// The frame is a reading but its payload did not decode.
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
