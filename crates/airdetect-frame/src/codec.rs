use bytes::BytesMut;
use serde::de::IgnoredAny;
use tokio_util::codec::Decoder;

use crate::error::FramingError;
use crate::frame::{Frame, MIN_FRAME_LEN, TRAILER};
use crate::packet::PacketKind;

/// Default maximum frame size: the sensors' 1 KiB transmit buffer.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// Earliest offset a trailer may start at; keeps header bytes from ever
/// being mistaken for the end of a frame.
const MIN_TRAILER_START: usize = MIN_FRAME_LEN - TRAILER.len();

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum frame size in bytes, trailer included. Default: 1 KiB.
    pub max_frame_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Splits a device byte stream into frames at the magic trailer.
///
/// Frames split across reads are reassembled and several frames in one read
/// are yielded one by one, in order.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    config: CodecConfig,
    /// Where the next trailer search resumes.
    next_index: usize,
}

impl FrameCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config,
            next_index: MIN_TRAILER_START,
        }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn find_trailer(&self, src: &[u8]) -> Option<usize> {
        let start = self.next_index.max(MIN_TRAILER_START);
        if src.len() < start + TRAILER.len() {
            return None;
        }
        src[start..]
            .windows(TRAILER.len())
            .position(|window| window == TRAILER)
            .map(|pos| start + pos)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FramingError> {
        let max = self.config.max_frame_len;

        match self.find_trailer(src) {
            Some(start) => {
                let end = start + TRAILER.len();
                if end > max {
                    return Err(FramingError::Oversized { len: end, max });
                }
                self.next_index = MIN_TRAILER_START;
                let bytes = src.split_to(end).freeze();
                tracing::trace!(len = bytes.len(), "framed");
                let frame = Frame::parse(bytes)?;
                ensure_single_body(&frame)?;
                Ok(Some(frame))
            }
            None => {
                if src.len() > max {
                    return Err(FramingError::Oversized {
                        len: src.len(),
                        max,
                    });
                }
                // A trailer may straddle the next read.
                self.next_index = src.len().saturating_sub(TRAILER.len() - 1);
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FramingError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FramingError::Incomplete(src.len())),
        }
    }
}

/// Reject a frame that swallowed the next one after a corrupted trailer.
///
/// Handshakes carry no payload and a reading carries one JSON object, so
/// anything past that belongs to another frame. A reading whose payload is
/// not valid JSON at all is left to payload decoding.
fn ensure_single_body(frame: &Frame) -> Result<(), FramingError> {
    let payload = frame.payload();
    let extra = match frame.kind() {
        PacketKind::Handshake => payload.len(),
        PacketKind::Reading(_) => {
            let mut values =
                serde_json::Deserializer::from_slice(payload).into_iter::<IgnoredAny>();
            match values.next() {
                Some(Ok(_)) => payload[values.byte_offset()..]
                    .iter()
                    .filter(|b| !b.is_ascii_whitespace())
                    .count(),
                _ => 0,
            }
        }
        PacketKind::Unrecognized(_) => 0,
    };

    if extra == 0 {
        return Ok(());
    }
    Err(FramingError::Concatenated {
        type_code: frame.type_code(),
        len: frame.len(),
        extra,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BufMut;
    use futures_util::StreamExt;
    use tokio_util::codec::FramedRead;

    use super::*;
    use crate::device::DeviceId;
    use crate::frame::{encode_frame, encode_handshake};

    const DEVICE: DeviceId = DeviceId::new([1, 2, 3, 4, 5, 6]);
    const PAYLOAD: &[u8] = br#"{"humidity":"50","temperature":"20","hcho":"10","value":"5"}"#;

    fn wire() -> BytesMut {
        let mut buf = BytesMut::new();
        encode_handshake(DEVICE, &mut buf);
        encode_frame(DEVICE, 0x4e, PAYLOAD, &mut buf);
        buf
    }

    #[test]
    fn splits_coalesced_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = wire();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(first.type_code(), 0x03);
        assert_eq!(second.type_code(), 0x4e);
        assert_eq!(second.payload(), PAYLOAD);
        assert!(buf.is_empty());
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn waits_for_split_frame() {
        let whole = wire();
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();

        // One byte at a time, so the trailer straddles reads too.
        for byte in whole.iter() {
            buf.put_u8(*byte);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].device_id(), DEVICE);
        assert_eq!(frames[1].payload(), PAYLOAD);
    }

    #[test]
    fn trailer_bytes_in_header_are_not_a_boundary() {
        let device = DeviceId::new([0xff, 0x23, 0x45, 0x4e, 0x44, 0x23]);
        let mut buf = BytesMut::new();
        encode_handshake(device, &mut buf);
        let len = buf.len();

        let frame = FrameCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.len(), len);
        assert_eq!(frame.device_id(), device);
    }

    fn corrupt_last_byte(buf: &mut BytesMut) {
        let last = buf.len() - 1;
        buf[last] = 0x00;
    }

    #[test]
    fn handshake_with_lost_trailer_is_rejected() {
        let mut buf = BytesMut::new();
        encode_handshake(DeviceId::new([0xaa; 6]), &mut buf);
        corrupt_last_byte(&mut buf);
        buf.extend_from_slice(&wire());

        let err = FrameCodec::new().decode(&mut buf).unwrap_err();
        assert!(
            matches!(err, FramingError::Concatenated { type_code: 0x03, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn reading_with_lost_trailer_is_rejected() {
        let mut buf = BytesMut::new();
        encode_frame(DEVICE, 0x4e, PAYLOAD, &mut buf);
        corrupt_last_byte(&mut buf);
        encode_frame(DEVICE, 0x4f, PAYLOAD, &mut buf);

        let err = FrameCodec::new().decode(&mut buf).unwrap_err();
        assert!(
            matches!(err, FramingError::Concatenated { type_code: 0x4e, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn whitespace_after_payload_is_accepted() {
        let mut buf = BytesMut::new();
        let mut payload = PAYLOAD.to_vec();
        payload.extend_from_slice(b" \r\n");
        encode_frame(DEVICE, 0x4e, &payload, &mut buf);

        let frame = FrameCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.payload(), payload.as_slice());
    }

    #[test]
    fn oversized_without_trailer_fails() {
        let cfg = CodecConfig { max_frame_len: 64 };
        let mut codec = FrameCodec::with_config(cfg);
        let mut buf = BytesMut::from(&[0u8; 65][..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FramingError::Oversized { len: 65, max: 64 }));
    }

    #[test]
    fn oversized_frame_with_trailer_fails() {
        let cfg = CodecConfig { max_frame_len: 40 };
        let mut codec = FrameCodec::with_config(cfg);
        let mut buf = BytesMut::new();
        encode_frame(DEVICE, 0x4e, PAYLOAD, &mut buf);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FramingError::Oversized { max: 40, .. }));
    }

    #[test]
    fn eof_mid_frame_is_incomplete() {
        let mut codec = FrameCodec::new();
        let mut buf = wire();
        buf.truncate(buf.len() - 3);

        let first = codec.decode_eof(&mut buf).unwrap();
        assert!(first.is_some());
        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, FramingError::Incomplete(_)));
    }

    #[test]
    fn eof_at_boundary_is_clean() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[tokio::test]
    async fn framed_read_over_async_stream() {
        let mut framed = FramedRead::new(Cursor::new(wire().to_vec()), FrameCodec::new());

        let first = framed.next().await.unwrap().unwrap();
        let second = framed.next().await.unwrap().unwrap();
        assert_eq!(first.type_code(), 0x03);
        assert_eq!(second.type_code(), 0x4e);
        assert!(framed.next().await.is_none());
    }
}
