//! Serial port transport for BGAPI modules.
//!
//! BGAPI dongles enumerate as USB CDC-ACM devices (`/dev/ttyACM*` on Linux,
//! `COMx` on Windows); modules wired to a UART use whatever baud rate the
//! firmware was built for, almost always 115200 8N1. Hardware flow control
//! is recommended by the module vendor and enabled by default.
//!
//! The frame length is carried in-band, so the transport does no framing:
//! [`receive`](Transport::receive) hands back whatever bytes the OS has.
//! When a USB dongle is unplugged the read side reports end of stream,
//! which surfaces as `Ok(0)`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};

use bgapi_core::error::{Error, Result};
use bgapi_core::transport::Transport;

/// Default baud rate for BGAPI modules.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// USB vendor id used by Bluegiga (now Silicon Labs) BLED112 dongles.
pub const BLED112_VID: u16 = 0x2458;
/// USB product id of the BLED112.
pub const BLED112_PID: u16 = 0x0001;

/// Link settings. Framing is always 8N1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Ignored by CDC-ACM dongles, must match the firmware for UART modules.
    pub baud_rate: u32,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            flow_control: FlowControl::Hardware,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    /// RTS/CTS.
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// A serial port the OS reports, with a hint whether it is a BLED112.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    pub is_bled112: bool,
}

/// List serial ports, BLED112 dongles first.
pub fn available_ports() -> Result<Vec<PortCandidate>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| Error::Transport(format!("failed to enumerate serial ports: {e}")))?;
    let mut candidates: Vec<PortCandidate> = ports
        .into_iter()
        .map(|port| PortCandidate {
            is_bled112: matches!(
                &port.port_type,
                SerialPortType::UsbPort(usb) if usb.vid == BLED112_VID && usb.pid == BLED112_PID
            ),
            name: port.port_name,
        })
        .collect();
    candidates.sort_by(|a, b| b.is_bled112.cmp(&a.is_bled112).then(a.name.cmp(&b.name)));
    Ok(candidates)
}

/// Serial link to a BGAPI module.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open `port` at `baud_rate` with RTS/CTS flow control.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(
            port,
            SerialConfig {
                baud_rate,
                ..SerialConfig::default()
            },
        )
        .await
    }

    /// Open `port` with explicit link settings.
    ///
    /// ```no_run
    /// # use bgapi_transport::{SerialTransport, SerialConfig, FlowControl};
    /// # async fn example() -> bgapi_core::Result<()> {
    /// let config = SerialConfig {
    ///     baud_rate: 115_200,
    ///     flow_control: FlowControl::None,
    /// };
    /// let transport = SerialTransport::open_with_config("/dev/ttyACM0", config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port,
            baud_rate = config.baud_rate,
            flow_control = ?config.flow_control,
            "opening serial port"
        );

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port, error = %e, "cannot open serial port");
                Error::Transport(format!("cannot open {port}: {e}"))
            })?;

        tracing::info!(port, baud_rate = config.baud_rate, "serial port open");
        Ok(SerialTransport {
            stream: Some(stream),
            port_name: port.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn stream(&mut self) -> Result<&mut SerialStream> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }
}

/// Unplugging a dongle shows up as one of these kinds, depending on the OS.
fn map_io_error(e: std::io::Error) -> Error {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::ConnectionReset => {
            Error::ConnectionLost
        }
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        let written = async {
            stream.write_all(data).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(port = %self.port_name, error = %e, "serial write failed");
            return Err(map_io_error(e));
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream()?;
        let read = tokio::time::timeout(timeout, stream.read(buf)).await;

        match read {
            Err(_) => Err(Error::Timeout),
            Ok(Ok(0)) => {
                tracing::debug!(port = %self.port_name, "serial port reported end of stream");
                Ok(0)
            }
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => {
                tracing::warn!(port = %self.port_name, error = %e, "serial read failed");
                Err(map_io_error(e))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        // Best effort; the port is released when the stream drops either way.
        if let Err(e) = stream.flush().await {
            tracing::debug!(port = %self.port_name, error = %e, "flush on close failed");
        }
        tracing::info!(port = %self.port_name, "serial port closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
