//! Transport implementations for the BGAPI driver.
//!
//! This crate provides [`SerialTransport`], the concrete
//! [`Transport`](bgapi_core::Transport) for modules attached over a USB CDC
//! or UART serial link (BLED112, BLE112, BLE121LR and similar dongles).
//!
//! # Example
//!
//! ```no_run
//! use bgapi_transport::SerialTransport;
//! use bgapi_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> bgapi_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 115_200).await?;
//!
//! // system_hello
//! transport.send(&[0x00, 0x00, 0x00, 0x01]).await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{FlowControl, PortCandidate, SerialConfig, SerialTransport, available_ports};
