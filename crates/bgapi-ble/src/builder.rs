//! BgapiBuilder -- fluent builder for constructing [`BgapiHandler`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, timing and queue sizes before the IO task starts.
//!
//! # Example
//!
//! ```no_run
//! use bgapi_ble::builder::BgapiBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> bgapi_core::Result<()> {
//! let handler = BgapiBuilder::new()
//!     .serial_port("/dev/ttyACM0")
//!     .command_timeout(Duration::from_secs(1))
//!     .build()
//!     .await?;
//! handler.hello().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use bgapi_core::error::{Error, Result};
use bgapi_core::transport::Transport;
use bgapi_transport::{FlowControl, SerialConfig, SerialTransport};
use bgapi_transport::serial::DEFAULT_BAUD_RATE;

use crate::dispatcher::EventDispatcher;
use crate::handler::{BgapiHandler, Lifecycle};
use crate::io::{IoConfig, Shared, spawn_io_task};
use crate::registry::PacketRegistry;
use crate::transaction::WaiterRegistry;

/// Fluent builder for [`BgapiHandler`].
pub struct BgapiBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    flow_control: bool,
    command_timeout: Duration,
    poll_interval: Duration,
    max_io_errors: u32,
    outbound_capacity: usize,
    event_capacity: usize,
    registry: Option<PacketRegistry>,
}

impl Default for BgapiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BgapiBuilder {
    pub fn new() -> Self {
        BgapiBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            flow_control: true,
            command_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            max_io_errors: 10,
            outbound_capacity: 32,
            event_capacity: 256,
            registry: None,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Set the baud rate (default: 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Enable or disable RTS/CTS flow control (default: enabled).
    pub fn flow_control(mut self, enabled: bool) -> Self {
        self.flow_control = enabled;
        self
    }

    /// Set the budget used by [`BgapiHandler::transaction`] (default: 2s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set how long a single transport read may block (default: 100ms).
    ///
    /// Shorter windows make shutdown and outbound writes more responsive at
    /// the cost of more wakeups.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the number of consecutive I/O errors tolerated before the
    /// handler is declared dead (default: 10).
    pub fn max_io_errors(mut self, n: u32) -> Self {
        self.max_io_errors = n;
        self
    }

    /// Set the outbound queue depth (default: 32).
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    /// Set the capacity of the broadcast event stream (default: 256).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Replace the standard packet catalog.
    pub fn registry(mut self, registry: PacketRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build a [`BgapiHandler`] with a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `bgapi-test-harness`) and for links other than a local serial port.
    /// Must be called from within a Tokio runtime.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<BgapiHandler> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidParameter(
                "poll_interval must be greater than zero".into(),
            ));
        }

        let shared = Arc::new(Shared {
            registry: self.registry.unwrap_or_else(PacketRegistry::standard),
            waiters: Arc::new(WaiterRegistry::new()),
            dispatcher: EventDispatcher::new(self.event_capacity),
            lifecycle: Lifecycle::new(),
        });
        let config = IoConfig {
            poll_interval: self.poll_interval,
            max_io_errors: self.max_io_errors,
            outbound_capacity: self.outbound_capacity,
        };
        tracing::debug!(?config, packets = shared.registry.len(), "starting BGAPI handler");

        let io = spawn_io_task(transport, config, Arc::clone(&shared));
        Ok(BgapiHandler::new(io, shared, self.command_timeout))
    }

    /// Build a [`BgapiHandler`] over a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<BgapiHandler> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let config = SerialConfig {
            baud_rate: self.baud_rate,
            flow_control: if self.flow_control {
                FlowControl::Hardware
            } else {
                FlowControl::None
            },
        };

        let transport = SerialTransport::open_with_config(port, config).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
