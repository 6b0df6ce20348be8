//! Telemetry receiver for networked air-quality sensors.
//!
//! airdetect accepts TCP connections from sensors, decodes their fixed-offset
//! frames into typed readings, and keeps the latest reading per device for
//! scraping.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP listener for device connections
//! - [`frame`]: Frame decoding and trailer-delimited stream framing
//! - [`device`]: Connection handling, reading stream, cache (behind `device` feature)
//! - [`metrics`]: Prometheus text rendering of the cache (behind `device` feature)

/// Re-export transport types.
pub mod transport {
    pub use airdetect_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use airdetect_frame::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use airdetect_device::*;
}

#[cfg(feature = "device")]
pub mod metrics;
