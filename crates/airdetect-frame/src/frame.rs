use bytes::{BufMut, Bytes, BytesMut};

use crate::device::{DeviceId, DEVICE_ID_LEN};
use crate::error::{DecodeError, FramingError, Result};
use crate::packet::{PacketKind, HANDSHAKE};
use crate::reading::Reading;

/// Magic trailer closing every frame: `"\xff#END#"`.
pub const TRAILER: [u8; 6] = [0xff, 0x23, 0x45, 0x4e, 0x44, 0x23];

/// Offset of the 6-byte device identity.
pub const DEVICE_ID_OFFSET: usize = 0x11;

/// Offset of the packet type code.
pub const TYPE_OFFSET: usize = 0x18;

/// Offset where a reading payload starts.
pub const PAYLOAD_OFFSET: usize = 0x1c;

/// Shortest well-formed frame: header through the type code, plus trailer.
pub const MIN_FRAME_LEN: usize = TYPE_OFFSET + 1 + TRAILER.len();

/// Shortest well-formed reading frame (empty payload).
pub const MIN_READING_FRAME_LEN: usize = PAYLOAD_OFFSET + TRAILER.len();

/// A frame whose envelope has been validated.
///
/// Wire layout:
/// ```text
/// ┌───────────┬─────────────┬───┬──────┬───┬─────────────┬──────────────────┐
/// │ 0..17     │ Device (6B) │   │ Type │   │ Payload     │ Trailer (6B)     │
/// │ opaque    │ 17..23      │23 │ 24   │.. │ 28..len-6   │ ff 23 45 4e 44 23│
/// └───────────┴─────────────┴───┴──────┴───┴─────────────┴──────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

/// A fully decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Connect frame announcing the device identity.
    Handshake { device: DeviceId },
    /// Measurement frame.
    Reading { device: DeviceId, reading: Reading },
}

impl Packet {
    /// The identity carried in the frame itself.
    pub fn device(&self) -> DeviceId {
        match self {
            Packet::Handshake { device } | Packet::Reading { device, .. } => *device,
        }
    }
}

impl Frame {
    /// Validate the envelope of one raw frame.
    pub fn parse(bytes: impl Into<Bytes>) -> std::result::Result<Self, FramingError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_FRAME_LEN {
            return Err(FramingError::TooShort {
                len: bytes.len(),
                min: MIN_FRAME_LEN,
            });
        }

        let trailer = &bytes[bytes.len() - TRAILER.len()..];
        if trailer != TRAILER {
            return Err(FramingError::BadTrailer(trailer.to_vec()));
        }

        Ok(Self { bytes })
    }

    /// Identity field of this frame.
    pub fn device_id(&self) -> DeviceId {
        let mut id = [0u8; DEVICE_ID_LEN];
        id.copy_from_slice(&self.bytes[DEVICE_ID_OFFSET..DEVICE_ID_OFFSET + DEVICE_ID_LEN]);
        DeviceId::new(id)
    }

    /// Raw type code.
    pub fn type_code(&self) -> u8 {
        self.bytes[TYPE_OFFSET]
    }

    /// Classified packet type.
    pub fn kind(&self) -> PacketKind {
        PacketKind::from_code(self.type_code())
    }

    /// Payload bytes between the header and the trailer.
    ///
    /// Empty for frames that end before the payload offset.
    pub fn payload(&self) -> &[u8] {
        let end = self.bytes.len() - TRAILER.len();
        if end <= PAYLOAD_OFFSET {
            return &[];
        }
        &self.bytes[PAYLOAD_OFFSET..end]
    }

    /// Total frame length including the trailer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: a valid frame holds at least a header and trailer.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode this frame into a typed packet.
    pub fn decode(&self) -> Result<Packet> {
        let device = self.device_id();
        match self.kind() {
            PacketKind::Handshake => Ok(Packet::Handshake { device }),
            PacketKind::Reading(_) => {
                if self.len() < MIN_READING_FRAME_LEN {
                    return Err(FramingError::TooShort {
                        len: self.len(),
                        min: MIN_READING_FRAME_LEN,
                    }
                    .into());
                }
                let reading = Reading::from_payload(self.payload())?;
                Ok(Packet::Reading { device, reading })
            }
            PacketKind::Unrecognized(type_code) => Err(DecodeError::UnrecognizedType {
                type_code,
                len: self.len(),
            }),
        }
    }
}

/// Validate and decode one raw frame.
pub fn decode_frame(buf: &[u8]) -> Result<Packet> {
    Frame::parse(Bytes::copy_from_slice(buf))?.decode()
}

/// Encode a frame into the wire format.
///
/// Header bytes outside the identity and type fields are zero.
pub fn encode_frame(device: DeviceId, type_code: u8, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(PAYLOAD_OFFSET + payload.len() + TRAILER.len());
    dst.put_bytes(0, DEVICE_ID_OFFSET);
    dst.put_slice(device.as_bytes());
    dst.put_bytes(0, TYPE_OFFSET - DEVICE_ID_OFFSET - DEVICE_ID_LEN);
    dst.put_u8(type_code);
    dst.put_bytes(0, PAYLOAD_OFFSET - TYPE_OFFSET - 1);
    dst.put_slice(payload);
    dst.put_slice(&TRAILER);
}

/// Encode a handshake frame for `device`.
pub fn encode_handshake(device: DeviceId, dst: &mut BytesMut) {
    encode_frame(device, HANDSHAKE, &[], dst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PayloadError;
    use crate::packet::{READING_FIRST, READING_LAST};

    const DEVICE: DeviceId = DeviceId::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    const PAYLOAD: &[u8] = br#"{"humidity":"55.5","temperature":"23.1","hcho":"120","value":"34"}"#;

    fn frame(type_code: u8, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(DEVICE, type_code, payload, &mut buf);
        buf
    }

    #[test]
    fn decodes_reading_frame() {
        let buf = frame(0x4e, PAYLOAD);
        assert_eq!(buf.len(), PAYLOAD_OFFSET + PAYLOAD.len() + TRAILER.len());

        let packet = decode_frame(&buf).unwrap();
        let Packet::Reading { device, reading } = packet else {
            panic!("expected reading, got {packet:?}");
        };
        assert_eq!(device, DEVICE);
        assert_eq!(reading.humidity, 55.5);
        assert_eq!(reading.temperature, 23.1);
        assert!((reading.hcho - 0.12).abs() < 1e-12);
        assert_eq!(reading.pm25, 34);
    }

    #[test]
    fn every_reading_type_code_decodes() {
        for code in READING_FIRST..=READING_LAST {
            let packet = decode_frame(&frame(code, PAYLOAD)).unwrap();
            assert!(matches!(packet, Packet::Reading { .. }), "type 0x{code:02x}");
        }
    }

    #[test]
    fn hcho_is_divided_by_one_thousand() {
        for raw in ["0", "1", "85", "1000", "2500.5"] {
            let payload = format!(
                r#"{{"humidity":"1","temperature":"1","hcho":"{raw}","value":"1"}}"#
            );
            let Packet::Reading { reading, .. } =
                decode_frame(&frame(0x4f, payload.as_bytes())).unwrap()
            else {
                panic!("expected reading");
            };
            let expected: f64 = raw.parse::<f64>().unwrap() / 1000.0;
            assert_eq!(reading.hcho, expected);
        }
    }

    #[test]
    fn decodes_handshake_frame() {
        let mut buf = BytesMut::new();
        encode_handshake(DEVICE, &mut buf);

        let packet = decode_frame(&buf).unwrap();
        assert_eq!(packet, Packet::Handshake { device: DEVICE });
        assert_eq!(packet.device(), DEVICE);
    }

    #[test]
    fn handshake_payload_is_ignored() {
        let packet = decode_frame(&frame(HANDSHAKE, b"not json")).unwrap();
        assert_eq!(packet, Packet::Handshake { device: DEVICE });
    }

    #[test]
    fn rejects_bad_trailer() {
        let mut buf = frame(0x4e, PAYLOAD);
        let last = buf.len() - 1;
        buf[last] = 0x00;

        let err = decode_frame(&buf).unwrap_err();
        assert!(matches!(err, DecodeError::Framing(FramingError::BadTrailer(_))));
    }

    #[test]
    fn rejects_truncated_frame() {
        let err = decode_frame(&TRAILER).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Framing(FramingError::TooShort { len: 6, .. })
        ));
    }

    #[test]
    fn reading_frame_must_reach_payload_offset() {
        let mut buf = BytesMut::new();
        buf.put_bytes(0, TYPE_OFFSET);
        buf.put_u8(0x4e);
        buf.put_slice(&TRAILER);

        let err = decode_frame(&buf).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Framing(FramingError::TooShort { .. })
        ));
    }

    #[test]
    fn unrecognized_type_is_classified() {
        let err = decode_frame(&frame(0x51, PAYLOAD)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnrecognizedType {
                type_code: 0x51,
                ..
            }
        ));
    }

    #[test]
    fn bad_payload_is_classified() {
        let err = decode_frame(&frame(0x4e, br#"{"humidity":"x"}"#)).unwrap_err();
        assert!(matches!(err, DecodeError::Payload(PayloadError::Json(_))));
    }

    #[test]
    fn frame_accessors() {
        let buf = frame(0x50, PAYLOAD);
        let frame = Frame::parse(buf.freeze()).unwrap();

        assert_eq!(frame.device_id(), DEVICE);
        assert_eq!(frame.type_code(), 0x50);
        assert_eq!(frame.kind(), PacketKind::Reading(0x50));
        assert_eq!(frame.payload(), PAYLOAD);
        assert!(!frame.is_empty());
    }
}
