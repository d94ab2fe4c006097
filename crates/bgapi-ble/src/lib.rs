//! BGAPI protocol engine for Bluetooth Smart modules.
//!
//! This crate implements the host side of the BGAPI binary protocol spoken
//! by BLED112-class modules over a serial link. It provides:
//!
//! - **Frame layer** ([`frame`]) -- the 4-byte header, outbound
//!   [`Command`]s and the resynchronizing [`FrameAssembler`].
//! - **Packet catalog** ([`packets`], [`enums`], [`registry`]) -- typed
//!   responses and events, protocol enumerations, and the lookup table that
//!   turns a frame into a [`Response`].
//! - **Command builders** ([`commands`]) -- one function per supported
//!   system, connection, attribute client and GAP command.
//! - **Advertising data** ([`eir`]) -- decoding of scan response payloads.
//! - **BgapiHandler** ([`handler`]) -- the transaction coordinator that ties
//!   the protocol engine to a [`Transport`](bgapi_core::Transport), with an
//!   event dispatcher ([`dispatcher`]) for unsolicited events.
//! - **BgapiBuilder** ([`builder`]) -- fluent builder for the handler.
//!
//! # Example
//!
//! ```
//! use bgapi_ble::commands::system_get_info;
//! use bgapi_ble::frame::FrameAssembler;
//!
//! assert_eq!(system_get_info().to_bytes(), vec![0x00, 0x00, 0x00, 0x08]);
//!
//! let mut assembler = FrameAssembler::new();
//! let frames = assembler.extend(&[0x00, 0x00, 0x00, 0x01]);
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].command_id, 0x01);
//! ```

pub mod builder;
pub mod commands;
pub mod dispatcher;
pub mod eir;
pub mod enums;
pub mod frame;
pub mod handler;
mod io;
pub mod packets;
pub mod registry;
pub mod transaction;

pub use builder::BgapiBuilder;
pub use dispatcher::{EventDispatcher, EventListener, SubscriptionId};
pub use eir::EirPacket;
pub use frame::{Command, Frame, FrameAssembler, MessageType, PacketId};
pub use handler::{BgapiHandler, HandlerListener};
pub use packets::Response;
pub use registry::{Decoder, PacketRegistry};
pub use transaction::{SendHandle, Transaction};
