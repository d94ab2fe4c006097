//! Bluetooth device addresses.
//!
//! BGAPI carries addresses as 6 raw bytes, least significant byte first.
//! Humans read them most significant byte first, colon separated, so the
//! textual form is the wire bytes reversed: wire `[AA,BB,CC,DD,EE,FF]` is
//! `"FF:EE:DD:CC:BB:AA"`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Length of a device address on the wire.
pub const ADDRESS_LEN: usize = 6;

/// A 48-bit Bluetooth device address, stored in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BdAddr([u8; ADDRESS_LEN]);

impl BdAddr {
    /// The all-zero address. Also what malformed text encodes to.
    pub const ZERO: BdAddr = BdAddr([0; ADDRESS_LEN]);

    /// Build an address from its wire bytes (least significant first).
    pub const fn from_wire(bytes: [u8; ADDRESS_LEN]) -> Self {
        BdAddr(bytes)
    }

    /// The address bytes in wire order.
    pub const fn wire_bytes(&self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    /// Returns `true` for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }

    /// Parse `"FF:EE:DD:CC:BB:AA"` leniently.
    ///
    /// Anything that is not six colon-separated hex octets yields
    /// [`BdAddr::ZERO`] without an error.
    pub fn parse_lenient(text: &str) -> Self {
        match text.parse() {
            Ok(addr) => addr,
            Err(_) => {
                tracing::debug!(address = %text, "malformed device address, using zero address");
                BdAddr::ZERO
            }
        }
    }
}

impl FromStr for BdAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; ADDRESS_LEN];
        let mut count = 0;
        for part in s.split(':') {
            if count == ADDRESS_LEN
                || part.len() != 2
                || !part.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(Error::InvalidParameter(format!("invalid device address: {s}")));
            }
            let octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::InvalidParameter(format!("invalid device address: {s}")))?;
            // Text is most significant first; wire is least significant first.
            bytes[ADDRESS_LEN - 1 - count] = octet;
            count += 1;
        }
        if count != ADDRESS_LEN {
            return Err(Error::InvalidParameter(format!("invalid device address: {s}")));
        }
        Ok(BdAddr(bytes))
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

impl From<[u8; ADDRESS_LEN]> for BdAddr {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        BdAddr::from_wire(bytes)
    }
}
