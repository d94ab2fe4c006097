//! Codec primitives for BGAPI payloads.
//!
//! The wire carries fields back to back with no padding or tags:
//!
//! - `uint8`, `uint16`, `uint32`: little-endian, fixed width
//! - `int8`: two's complement in one byte
//! - `bool`: one byte, any non-zero value is `true`
//! - `uint8array`: one length byte (0..=255) followed by that many bytes
//! - `bd_addr`: six raw bytes, least significant first
//!
//! [`PacketWriter`] appends fields for outbound commands. [`PacketReader`]
//! walks an inbound payload with a cursor and refuses to read past the end
//! of the frame.

use bytes::{BufMut, Bytes, BytesMut};

use crate::address::{ADDRESS_LEN, BdAddr};
use crate::error::{Error, Result};

/// Appends little-endian fields to an outbound payload.
#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        PacketWriter {
            buf: BytesMut::with_capacity(16),
        }
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn put_i8(&mut self, value: i8) -> &mut Self {
        self.buf.put_i8(value);
        self
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(value as u8);
        self
    }

    /// Append a length-prefixed byte array.
    ///
    /// Fails with [`Error::InvalidParameter`] if `data` is longer than 255
    /// bytes, since the prefix is a single byte.
    pub fn put_u8_array(&mut self, data: &[u8]) -> Result<&mut Self> {
        let len = u8::try_from(data.len()).map_err(|_| {
            Error::InvalidParameter(format!("array of {} bytes exceeds 255", data.len()))
        })?;
        self.buf.put_u8(len);
        self.buf.put_slice(data);
        Ok(self)
    }

    pub fn put_address(&mut self, addr: &BdAddr) -> &mut Self {
        self.buf.put_slice(&addr.wire_bytes());
        self
    }

    /// Number of payload bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the payload.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over an inbound payload.
///
/// Every read checks the remaining length first and returns
/// [`Error::Truncated`] instead of advancing past the end.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Start reading at the beginning of `payload`.
    pub fn new(payload: &'a [u8]) -> Self {
        PacketReader { buf: payload, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a length-prefixed byte array.
    pub fn read_u8_array(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u8()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_address(&mut self) -> Result<BdAddr> {
        let b = self.take(ADDRESS_LEN)?;
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(b);
        Ok(BdAddr::from_wire(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn written(f: impl FnOnce(&mut PacketWriter)) -> Bytes {
        let mut w = PacketWriter::new();
        f(&mut w);
        w.finish()
    }

    #[test]
    fn u16_is_little_endian() {
        let bytes = written(|w| {
            w.put_u16(0x1234);
        });
        assert_eq!(&bytes[..], &[0x34, 0x12]);
    }

    #[test]
    fn u32_is_little_endian() {
        let bytes = written(|w| {
            w.put_u32(0xDEADBEEF);
        });
        assert_eq!(&bytes[..], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn u8_full_range() {
        for v in 0..=u8::MAX {
            let bytes = written(|w| {
                w.put_u8(v);
            });
            assert_eq!(PacketReader::new(&bytes).read_u8().unwrap(), v);
        }
    }

    #[test]
    fn i8_full_range() {
        for v in i8::MIN..=i8::MAX {
            let bytes = written(|w| {
                w.put_i8(v);
            });
            assert_eq!(PacketReader::new(&bytes).read_i8().unwrap(), v);
        }
    }

    #[test]
    fn i8_reads_twos_complement() {
        assert_eq!(PacketReader::new(&[0xC4]).read_i8().unwrap(), -60);
        assert_eq!(PacketReader::new(&[0x80]).read_i8().unwrap(), -128);
        assert_eq!(PacketReader::new(&[0x7F]).read_i8().unwrap(), 127);
    }

    #[test]
    fn u16_full_range() {
        for v in 0..=u16::MAX {
            let bytes = written(|w| {
                w.put_u16(v);
            });
            assert_eq!(PacketReader::new(&bytes).read_u16().unwrap(), v);
        }
    }

    #[test]
    fn u32_sampled_and_edges() {
        let mut rng = rand::thread_rng();
        let mut values = vec![0, 1, 0xFF, 0x100, 0xFFFF, 0x1_0000, u32::MAX - 1, u32::MAX];
        values.extend((0..10_000).map(|_| rng.gen_range(0..=u32::MAX)));
        for v in values {
            let bytes = written(|w| {
                w.put_u32(v);
            });
            assert_eq!(PacketReader::new(&bytes).read_u32().unwrap(), v);
        }
    }

    #[test]
    fn bool_non_zero_is_true() {
        assert!(!PacketReader::new(&[0x00]).read_bool().unwrap());
        assert!(PacketReader::new(&[0x01]).read_bool().unwrap());
        assert!(PacketReader::new(&[0xA5]).read_bool().unwrap());
    }

    #[test]
    fn u8_array_is_length_prefixed() {
        let bytes = written(|w| {
            w.put_u8_array(&[0x0A, 0x0B, 0x0C]).unwrap();
        });
        assert_eq!(&bytes[..], &[0x03, 0x0A, 0x0B, 0x0C]);
        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_u8_array().unwrap(), vec![0x0A, 0x0B, 0x0C]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn u8_array_empty_and_max() {
        let empty = written(|w| {
            w.put_u8_array(&[]).unwrap();
        });
        assert_eq!(&empty[..], &[0x00]);

        let max = vec![0x5A; 255];
        let bytes = written(|w| {
            w.put_u8_array(&max).unwrap();
        });
        assert_eq!(bytes.len(), 256);
        assert_eq!(PacketReader::new(&bytes).read_u8_array().unwrap(), max);
    }

    #[test]
    fn u8_array_rejects_oversize() {
        let mut w = PacketWriter::new();
        let result = w.put_u8_array(&[0u8; 256]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        assert!(w.is_empty());
    }

    #[test]
    fn address_round_trip_sampled() {
        let mut rng = rand::thread_rng();
        for _ in 0..5_000 {
            let mut raw = [0u8; ADDRESS_LEN];
            rng.fill(&mut raw);
            let addr = BdAddr::from_wire(raw);
            let bytes = written(|w| {
                w.put_address(&addr);
            });
            assert_eq!(&bytes[..], &raw);
            assert_eq!(PacketReader::new(&bytes).read_address().unwrap(), addr);
        }
    }

    #[test]
    fn fields_decode_in_sequence() {
        let bytes = written(|w| {
            w.put_u8(0x01).put_u16(0x0203).put_i8(-2).put_bool(true);
        });
        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0203);
        assert_eq!(r.read_i8().unwrap(), -2);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.position(), 5);
    }

    #[test]
    fn truncated_reads_do_not_advance() {
        let mut r = PacketReader::new(&[0x01]);
        let err = r.read_u16().unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                needed: 2,
                available: 1
            }
        ));
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn truncated_address_and_u32() {
        assert!(PacketReader::new(&[0; 5]).read_address().is_err());
        assert!(PacketReader::new(&[0; 3]).read_u32().is_err());
    }

    #[test]
    fn truncated_array_body() {
        // Length byte claims 4 bytes, only 2 follow.
        let mut r = PacketReader::new(&[0x04, 0xAA, 0xBB]);
        assert!(matches!(
            r.read_u8_array(),
            Err(Error::Truncated {
                needed: 4,
                available: 2
            })
        ));
    }
}
