//! Device connection management for air-quality sensors.
//!
//! This is the "just works" layer: bind the device port, and every decoded
//! reading from every connected sensor arrives on a [`ReadingStream`].
//! Attach an [`AggregationCache`] to keep the latest reading per device.

pub mod cache;
pub mod connection;
pub mod error;
pub mod listener;
pub mod record;
pub mod stream;

pub use cache::AggregationCache;
pub use connection::{Binding, ConnectionConfig, DeviceConnection, DEFAULT_IDLE_TIMEOUT};
pub use error::{ConnectionError, DeviceError, Result};
pub use listener::{DeviceListener, ACCEPT_BACKOFF};
pub use record::{now_millis, ReadingRecord};
pub use stream::{ReadingStream, ReadingSubscription};
