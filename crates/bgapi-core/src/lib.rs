//! bgapi-core: Core traits, types, and error definitions for the BGAPI driver.
//!
//! This crate holds the pieces every other crate in the workspace shares:
//! the error type, the byte-stream [`Transport`] abstraction, the wire codec
//! primitives and the device address type. It knows nothing about frames,
//! packet catalogs or transactions.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`PacketWriter`] / [`PacketReader`] -- little-endian field codec
//! - [`BdAddr`] -- 48-bit device address
//! - [`Error`] / [`Result`] -- error handling

pub mod address;
pub mod codec;
pub mod error;
pub mod transport;

pub use address::{ADDRESS_LEN, BdAddr};
pub use codec::{PacketReader, PacketWriter};
pub use error::{Error, Result};
pub use transport::Transport;
