use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use airdetect_frame::{DeviceId, Reading};
use serde::{Deserialize, Serialize};

/// A decoded reading tagged with where and when it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    #[serde(flatten)]
    pub reading: Reading,
    /// Identity the connection was bound to, not the frame's own field.
    pub device: DeviceId,
    /// Receive time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Remote address of the device connection.
    pub remote_addr: SocketAddr,
}

impl ReadingRecord {
    /// Stamp a reading with the current time.
    pub fn new(reading: Reading, device: DeviceId, remote_addr: SocketAddr) -> Self {
        Self {
            reading,
            device,
            timestamp_ms: now_millis(),
            remote_addr,
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
