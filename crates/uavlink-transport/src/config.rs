use std::time::Duration;

use crate::error::{Result, TransportError};

/// Baud rate used by the flight controller firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Poll interval for blocking serial reads.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Where and how to open the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Serial port identifier (`/dev/ttyUSB0`, `COM5`, ...).
    pub port: Option<String>,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// How long a blocking read waits before re-checking for shutdown.
    pub read_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl LinkConfig {
    /// Create a config for `port` at `baud_rate`.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: Some(port.into()),
            baud_rate,
            ..Self::default()
        }
    }

    /// Check the config and return the port name.
    ///
    /// Missing or unusable values surface as [`TransportError::InvalidConfig`],
    /// which callers retry exactly like an absent device.
    pub fn validate(&self) -> Result<&str> {
        let port = match self.port.as_deref().map(str::trim) {
            Some(port) if !port.is_empty() => port,
            _ => {
                return Err(TransportError::InvalidConfig(
                    "no serial port configured".to_string(),
                ))
            }
        };
        if self.baud_rate == 0 {
            return Err(TransportError::InvalidConfig(format!(
                "baud rate must be non-zero for {port}"
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(TransportError::InvalidConfig(
                "read timeout must be non-zero".to_string(),
            ));
        }
        Ok(port)
    }
}
