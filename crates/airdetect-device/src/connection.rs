use std::net::SocketAddr;
use std::time::Duration;

use airdetect_frame::{
    CodecConfig, DecodeError, DeviceId, Frame, FrameCodec, FramingError, Packet,
    DEFAULT_MAX_FRAME_LEN,
};
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::error::ConnectionError;
use crate::record::ReadingRecord;
use crate::stream::ReadingStream;

/// Default idle deadline: a sensor reports well within five minutes.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Per-connection behaviour.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum time to wait for the next frame before closing.
    pub idle_timeout: Duration,
    /// Maximum frame size in bytes, trailer included.
    pub max_frame_len: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Device identity state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// No handshake seen yet.
    Unbound,
    /// Bound by the first handshake; never changes afterwards.
    Bound(DeviceId),
}

/// One sensor connection.
///
/// Owns the socket: when [`run`](Self::run) returns, for whatever reason,
/// the socket is dropped and therefore closed.
pub struct DeviceConnection<S> {
    frames: FramedRead<S, FrameCodec>,
    remote_addr: SocketAddr,
    binding: Binding,
    idle_timeout: Duration,
}

impl<S: AsyncRead + Unpin> DeviceConnection<S> {
    /// Wrap a connected stream with default configuration.
    pub fn new(stream: S, remote_addr: SocketAddr) -> Self {
        Self::with_config(stream, remote_addr, &ConnectionConfig::default())
    }

    /// Wrap a connected stream with explicit configuration.
    pub fn with_config(stream: S, remote_addr: SocketAddr, config: &ConnectionConfig) -> Self {
        let codec = FrameCodec::with_config(CodecConfig {
            max_frame_len: config.max_frame_len,
        });
        Self {
            frames: FramedRead::new(stream, codec),
            remote_addr,
            binding: Binding::Unbound,
            idle_timeout: config.idle_timeout,
        }
    }

    /// Current binding state.
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// Remote address of the device.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Read and handle frames until the connection ends.
    ///
    /// Returns `Ok(())` when the device closes the connection between
    /// frames. Every decoded reading is published on `output` before the
    /// next read, so a slow consumer slows this connection only.
    pub async fn run(mut self, output: ReadingStream) -> Result<(), ConnectionError> {
        loop {
            let frame = match tokio::time::timeout(self.idle_timeout, self.frames.next()).await {
                Err(_) => return Err(ConnectionError::IdleTimeout(self.idle_timeout)),
                Ok(None) => return Ok(()),
                Ok(Some(Err(err))) => return Err(err.into()),
                Ok(Some(Ok(frame))) => frame,
            };

            if let Some(record) = self.handle_frame(&frame)? {
                output.publish(record).await;
            }
        }
    }

    /// Apply one frame to the connection state.
    ///
    /// Returns the record to forward, if any. Only envelope failures are
    /// returned as errors; everything else is logged and the frame dropped.
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Option<ReadingRecord>, FramingError> {
        if let Binding::Bound(bound) = self.binding {
            let got = frame.device_id();
            if got != bound {
                warn!(
                    expected = %bound,
                    got = %got,
                    "frame carries inconsistent device id"
                );
            }
        }

        let packet = match frame.decode() {
            Ok(packet) => packet,
            Err(DecodeError::Framing(err)) => return Err(err),
            Err(DecodeError::UnrecognizedType { type_code, len }) => {
                warn!(
                    type_code = format_args!("0x{type_code:02x}"),
                    len,
                    "unknown packet type; dropped"
                );
                return Ok(None);
            }
            Err(DecodeError::Payload(err)) => {
                warn!(error = %err, "undecodable reading; dropped");
                return Ok(None);
            }
        };

        match (packet, self.binding) {
            (Packet::Handshake { device }, Binding::Unbound) => {
                info!(%device, "device bound");
                self.binding = Binding::Bound(device);
                Ok(None)
            }
            (Packet::Handshake { .. }, Binding::Bound(_)) => {
                debug!("repeated handshake");
                Ok(None)
            }
            (Packet::Reading { reading, .. }, Binding::Bound(device)) => {
                debug!(
                    %device,
                    pm25 = reading.pm25,
                    hcho = reading.hcho,
                    temperature = reading.temperature,
                    humidity = reading.humidity,
                    "reading"
                );
                Ok(Some(ReadingRecord::new(reading, device, self.remote_addr)))
            }
            (Packet::Reading { device, .. }, Binding::Unbound) => {
                warn!(%device, "reading before handshake; dropped");
                Ok(None)
            }
        }
    }
}
