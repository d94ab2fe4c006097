//! # bgapi -- Host driver for BGAPI Bluetooth Smart modules
//!
//! `bgapi` is an asynchronous Rust driver for Bluetooth Smart modules that
//! speak the BGAPI binary protocol over a serial link, such as the BLED112
//! USB dongle. It frames commands, correlates responses, and delivers
//! unsolicited events to listeners.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bgapi::BgapiBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handler = BgapiBuilder::new()
//!         .serial_port("/dev/ttyACM0")
//!         .build()
//!         .await?;
//!
//!     let info = handler.get_info().await?;
//!     println!("firmware {}", info.version());
//!     println!("address  {}", handler.address().await?);
//!
//!     handler.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate              | Purpose                                          |
//! |--------------------|--------------------------------------------------|
//! | `bgapi-core`       | Errors, [`Transport`] trait, codec, [`BdAddr`]   |
//! | `bgapi-transport`  | Serial port transport                            |
//! | `bgapi-ble`        | Frames, packet catalog, handler and dispatcher   |
//! | **`bgapi`**        | This facade crate -- re-exports everything       |
//!
//! ## Events
//!
//! Unsolicited events (scan responses, connection status, disconnects) go
//! to every registered [`EventListener`] and to the broadcast stream
//! returned by [`BgapiHandler::subscribe`]:
//!
//! ```no_run
//! use bgapi::{BgapiHandler, Response};
//! # async fn example(handler: &BgapiHandler) {
//! let mut events = handler.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let Response::GapScanResponse(scan) = &*event {
//!         println!("{} {} dBm", scan.sender, scan.rssi);
//!     }
//! }
//! # }
//! ```

pub use bgapi_core::*;

pub use bgapi_ble::{
    BgapiBuilder, BgapiHandler, Command, Decoder, EirPacket, EventDispatcher, EventListener,
    Frame, FrameAssembler, HandlerListener, MessageType, PacketId, PacketRegistry, Response,
    SendHandle, SubscriptionId, Transaction,
};
pub use bgapi_ble::{builder, commands, dispatcher, eir, enums, frame, handler, packets, registry};
pub use bgapi_transport::serial;
pub use bgapi_transport::{FlowControl, PortCandidate, SerialConfig, SerialTransport, available_ports};
