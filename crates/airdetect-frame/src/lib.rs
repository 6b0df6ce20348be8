//! Wire format decoding for air-quality sensor frames.
//!
//! Every frame sent by a sensor has the same fixed-offset layout:
//! - A 6-byte device hardware address at offset 17
//! - A 1-byte packet type at offset 24
//! - A JSON payload with string-encoded numbers from offset 28
//! - A 6-byte magic trailer (`"\xff#END#"`)
//!
//! [`FrameCodec`] splits a byte stream at the trailer; [`Frame`] and
//! [`decode_frame`] turn one frame into a typed [`Packet`].

pub mod codec;
pub mod device;
pub mod error;
pub mod frame;
pub mod packet;
pub mod reading;

pub use codec::{CodecConfig, FrameCodec, DEFAULT_MAX_FRAME_LEN};
pub use device::{DeviceId, ParseDeviceIdError, DEVICE_ID_LEN};
pub use error::{DecodeError, FieldError, FramingError, PayloadError, Result};
pub use frame::{
    decode_frame, encode_frame, encode_handshake, Frame, Packet, MIN_FRAME_LEN,
    MIN_READING_FRAME_LEN, TRAILER,
};
pub use packet::{kind_name, PacketKind, HANDSHAKE, READING_FIRST, READING_LAST};
pub use reading::Reading;
