//! Duplex link capability for uavlink.
//!
//! Provides a unified byte-stream interface over the physical connection to
//! the flight controller:
//! - Serial ports (behind the `serial` feature)
//! - In-process duplex pipes (tests and embedding)
//!
//! This is the lowest layer of uavlink. Everything else builds on top of
//! the [`LinkStream`] type and the [`Connector`] trait provided here.

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use config::{LinkConfig, DEFAULT_BAUD_RATE};
pub use error::{Result, TransportError};
pub use memory::MemoryConnector;
pub use traits::{Connector, LinkStream};

#[cfg(feature = "serial")]
pub use serial::{available_ports, PortInfo, SerialConnector};
