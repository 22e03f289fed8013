use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{Result, TransportError};
use crate::traits::{Connector, LinkStream};

const BRIDGE_CAPACITY: usize = 16 * 1024;
const READ_CHUNK_SIZE: usize = 1024;
const WRITE_CHUNK_SIZE: usize = 1024;

/// Serial port connector.
///
/// The `serialport` crate only offers blocking I/O, so an open port is
/// bridged onto an in-process pipe by two pump threads: one copies device
/// bytes into the pipe, the other drains the pipe onto the device. The
/// async side only ever sees the pipe.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: LinkConfig,
}

impl SerialConnector {
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }
}

impl Connector for SerialConnector {
    /// Opening and clearing the device blocks, so it runs on the blocking
    /// pool and the calling task only awaits the result.
    async fn connect(&self) -> Result<LinkStream> {
        let config = self.config.clone();
        let handle = Handle::try_current().map_err(|err| {
            TransportError::Io(std::io::Error::other(format!(
                "serial bridge needs a tokio runtime: {err}"
            )))
        })?;

        handle
            .clone()
            .spawn_blocking(move || open_bridge(&config, handle))
            .await
            .map_err(|err| {
                TransportError::Io(std::io::Error::other(format!(
                    "serial open task failed: {err}"
                )))
            })?
    }

    fn endpoint(&self) -> String {
        match &self.config.port {
            Some(port) => format!("{port}@{}", self.config.baud_rate),
            None => "<unconfigured>".to_string(),
        }
    }
}

fn open_port(config: &LinkConfig, port_name: &str) -> Result<Box<dyn SerialPort>> {
    let open_err = |source: serialport::Error| TransportError::Open {
        port: port_name.to_string(),
        source: source.into(),
    };

    let port = serialport::new(port_name, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(open_err)?;

    // Stale bytes from before the open belong to no session.
    port.clear(ClearBuffer::Input).map_err(open_err)?;
    Ok(port)
}

// Blocking: opens the device and starts both pump threads.
fn open_bridge(config: &LinkConfig, handle: Handle) -> Result<LinkStream> {
    let port_name = config.validate()?;
    let writer_port = open_port(config, port_name)?;
    let reader_port = writer_port.try_clone().map_err(|source| TransportError::Open {
        port: port_name.to_string(),
        source: source.into(),
    })?;

    let (app_end, pump_end) = tokio::io::duplex(BRIDGE_CAPACITY);
    let (pump_rd, pump_wr) = tokio::io::split(pump_end);
    let closed = Arc::new(AtomicBool::new(false));

    spawn_pump("uavlink-serial-rx", {
        let closed = Arc::clone(&closed);
        let handle = handle.clone();
        move || pump_inbound(reader_port, pump_wr, closed, handle)
    })?;
    spawn_pump("uavlink-serial-tx", {
        let closed = Arc::clone(&closed);
        move || pump_outbound(writer_port, pump_rd, closed, handle)
    })?;

    info!(port = port_name, baud = config.baud_rate, "opened serial port");
    Ok(LinkStream::from_serial(SerialBridge {
        stream: app_end,
        closed,
    }))
}

/// Async end of a bridged serial port.
///
/// Dropping it tells both pump threads to stop, which releases the port.
pub(crate) struct SerialBridge {
    stream: DuplexStream,
    closed: Arc<AtomicBool>,
}

impl SerialBridge {
    pub(crate) fn stream_mut(&mut self) -> &mut DuplexStream {
        &mut self.stream
    }
}

impl Drop for SerialBridge {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn spawn_pump<F>(name: &str, f: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map(|_| ())
        .map_err(TransportError::Io)
}

fn pump_inbound(
    mut port: Box<dyn SerialPort>,
    mut pipe: WriteHalf<DuplexStream>,
    closed: Arc<AtomicBool>,
    handle: Handle,
) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    while !closed.load(Ordering::Acquire) {
        let read = match port.read(&mut chunk) {
            Ok(0) => {
                debug!("serial port reported end of stream");
                break;
            }
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::TimedOut => continue,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "serial read failed");
                break;
            }
        };
        if handle.block_on(pipe.write_all(&chunk[..read])).is_err() {
            break;
        }
    }
    closed.store(true, Ordering::Release);
    // Lets the async reader observe end of stream even while the tx pump
    // still holds the other half of the pipe.
    let _ = handle.block_on(pipe.shutdown());
    debug!("serial rx pump stopped");
}

fn pump_outbound(
    mut port: Box<dyn SerialPort>,
    mut pipe: ReadHalf<DuplexStream>,
    closed: Arc<AtomicBool>,
    handle: Handle,
) {
    let mut chunk = [0u8; WRITE_CHUNK_SIZE];
    loop {
        let read = match handle.block_on(pipe.read(&mut chunk)) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if let Err(err) = port.write_all(&chunk[..read]).and_then(|()| port.flush()) {
            warn!(error = %err, "serial write failed");
            break;
        }
    }
    closed.store(true, Ordering::Release);
    debug!("serial tx pump stopped");
}

/// A serial port visible to the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
}

/// List serial ports visible to the operating system.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(|err| TransportError::Io(err.into()))?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, description) = match port.port_type {
                SerialPortType::UsbPort(usb) => {
                    let description = match (usb.manufacturer, usb.product) {
                        (Some(m), Some(p)) => Some(format!("{m} {p}")),
                        (m, p) => m.or(p),
                    };
                    (
                        format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
                        description,
                    )
                }
                SerialPortType::PciPort => ("pci".to_string(), None),
                SerialPortType::BluetoothPort => ("bluetooth".to_string(), None),
                SerialPortType::Unknown => ("unknown".to_string(), None),
            };
            PortInfo {
                name: port.port_name,
                kind,
                description,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_port_is_invalid_config() {
        let connector = SerialConnector::new(LinkConfig::default());
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfig(_)));
        assert_eq!(connector.endpoint(), "<unconfigured>");
    }

    #[tokio::test]
    async fn missing_device_is_open_error() {
        let connector = SerialConnector::new(LinkConfig::new(
            "/dev/uavlink-test-port-that-does-not-exist",
            115_200,
        ));
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn endpoint_includes_baud() {
        let connector = SerialConnector::new(LinkConfig::new("COM5", 115_200));
        assert_eq!(connector.endpoint(), "COM5@115200");
    }
}
