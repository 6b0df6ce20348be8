//! TCP transport for air-quality sensor devices.
//!
//! Sensors dial a single well-known stream port and keep the connection open,
//! pushing frames whenever they have a new measurement. This is the lowest
//! layer of airdetect: it binds that port and hands accepted sockets (with
//! their remote address) to the device layer.

pub mod error;
pub mod tcp;

pub use error::{Result, TransportError};
pub use tcp::{TcpTransport, DEFAULT_DEVICE_ADDR};
