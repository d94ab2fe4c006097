//! BGAPI frame header, outbound commands and the inbound frame assembler.
//!
//! # Frame format
//!
//! ```text
//! byte 0   bit 7     message kind (0 = command/response, 1 = event)
//!          bits 6:3  technology type, 0 for Bluetooth Smart
//!          bits 2:0  payload length high bits, always 0 here
//! byte 1             payload length (0..=60)
//! byte 2             class id
//! byte 3             command id
//! byte 4..           payload
//! ```
//!
//! A frame never exceeds 64 bytes. There is no preamble and no checksum, so
//! the only defence against line noise is the header sanity check performed
//! by [`FrameAssembler`].

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use bgapi_core::codec::PacketWriter;
use bgapi_core::error::{Error, Result};

/// Length of the fixed frame header.
pub const HEADER_LEN: usize = 4;

/// Largest frame the protocol allows, header included.
pub const MAX_FRAME_LEN: usize = 64;

/// Largest payload that fits in a frame.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - HEADER_LEN;

/// Message-kind bit in header byte 0.
pub const EVENT_FLAG: u8 = 0x80;

/// Bits of header byte 0 that must be clear for this protocol profile.
const RESERVED_MASK: u8 = 0x7F;

/// Whether a frame is a command/response or an unsolicited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Command (outbound) or its response (inbound).
    Command,
    /// Unsolicited event.
    Event,
}

impl MessageType {
    fn from_header_byte(byte: u8) -> Self {
        if byte & EVENT_FLAG != 0 {
            MessageType::Event
        } else {
            MessageType::Command
        }
    }
}

/// Identity of a packet type: the key of the packet registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketId {
    pub class_id: u8,
    pub command_id: u8,
    pub is_event: bool,
}

impl PacketId {
    /// Identity of a command, or of the response to it.
    pub const fn response(class_id: u8, command_id: u8) -> Self {
        PacketId {
            class_id,
            command_id,
            is_event: false,
        }
    }

    /// Identity of an event.
    pub const fn event(class_id: u8, command_id: u8) -> Self {
        PacketId {
            class_id,
            command_id,
            is_event: true,
        }
    }
}

/// One complete inbound frame, as delimited by its length byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageType,
    pub class_id: u8,
    pub command_id: u8,
    pub payload: Bytes,
}

impl Frame {
    /// Returns `true` when the message-kind bit was set.
    pub fn is_event(&self) -> bool {
        self.kind == MessageType::Event
    }

    pub fn id(&self) -> PacketId {
        PacketId {
            class_id: self.class_id,
            command_id: self.command_id,
            is_event: self.is_event(),
        }
    }

    /// Re-encode the frame to wire bytes (header plus payload).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u8(match self.kind {
            MessageType::Command => 0x00,
            MessageType::Event => EVENT_FLAG,
        });
        buf.put_u8(self.payload.len() as u8);
        buf.put_u8(self.class_id);
        buf.put_u8(self.command_id);
        buf.put_slice(&self.payload);
        buf.to_vec()
    }
}

/// An outbound command.
///
/// Built by the functions in [`commands`](crate::commands); immutable once
/// constructed. The payload is validated against the frame cap up front so
/// that serialization cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    class_id: u8,
    command_id: u8,
    payload: Bytes,
}

impl Command {
    /// Create a command from an already encoded payload.
    ///
    /// Fails with [`Error::InvalidParameter`] if the payload does not fit in
    /// a single frame.
    pub fn new(class_id: u8, command_id: u8, payload: Bytes) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::InvalidParameter(format!(
                "command 0x{:02X}/0x{:02X} payload of {} bytes exceeds {}",
                class_id,
                command_id,
                payload.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        Ok(Command {
            class_id,
            command_id,
            payload,
        })
    }

    /// Create a command from a [`PacketWriter`].
    pub fn from_writer(class_id: u8, command_id: u8, writer: PacketWriter) -> Result<Self> {
        Self::new(class_id, command_id, writer.finish())
    }

    /// Builder for fixed-width payloads, which always fit in a frame.
    pub(crate) fn fixed(class_id: u8, command_id: u8, payload: Bytes) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);
        Command {
            class_id,
            command_id,
            payload,
        }
    }

    /// A command with no parameters.
    pub fn empty(class_id: u8, command_id: u8) -> Self {
        Command {
            class_id,
            command_id,
            payload: Bytes::new(),
        }
    }

    pub fn class_id(&self) -> u8 {
        self.class_id
    }

    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Identity of the response this command expects.
    pub fn response_id(&self) -> PacketId {
        PacketId::response(self.class_id, self.command_id)
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u8(0x00);
        buf.put_u8(self.payload.len() as u8);
        buf.put_u8(self.class_id);
        buf.put_u8(self.command_id);
        buf.put_slice(&self.payload);
        buf.to_vec()
    }
}

/// Reassembles frames from an unframed byte stream.
///
/// Bytes are pushed one at a time. Header byte 0 must have every bit other
/// than the message-kind bit clear, and header byte 1 must not declare more
/// than [`MAX_PAYLOAD_LEN`] payload bytes. When either check fails, every
/// byte collected for the current frame is discarded along with the
/// offending byte, and collection restarts with the next byte pushed.
#[derive(Debug)]
pub struct FrameAssembler {
    buf: Vec<u8>,
    frame_len: usize,
    resyncs: u64,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        FrameAssembler {
            buf: Vec::with_capacity(MAX_FRAME_LEN),
            frame_len: 0,
            resyncs: 0,
        }
    }

    /// Number of bytes collected for the frame in progress.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// How many times the assembler has discarded input to resynchronize.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.frame_len = 0;
    }

    /// Push one byte. Returns a frame when this byte completed one.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if self.buf.len() >= MAX_FRAME_LEN {
            warn!(collected = self.buf.len(), "frame buffer overflow, resetting");
            self.reset();
            self.resyncs += 1;
        }

        match self.buf.len() {
            0 if byte & RESERVED_MASK != 0 => {
                self.discard(byte, "invalid header byte 0");
                return None;
            }
            1 if byte as usize > MAX_PAYLOAD_LEN => {
                self.discard(byte, "payload length exceeds frame cap");
                return None;
            }
            1 => self.frame_len = HEADER_LEN + byte as usize,
            _ => {}
        }

        self.buf.push(byte);

        if self.buf.len() >= HEADER_LEN && self.buf.len() == self.frame_len {
            let frame = Frame {
                kind: MessageType::from_header_byte(self.buf[0]),
                class_id: self.buf[2],
                command_id: self.buf[3],
                payload: Bytes::copy_from_slice(&self.buf[HEADER_LEN..]),
            };
            self.reset();
            return Some(frame);
        }
        None
    }

    /// Push a chunk of bytes and collect every frame it completes.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    fn discard(&mut self, byte: u8, reason: &'static str) {
        warn!(
            discarded = ?self.buf,
            byte,
            reason,
            "resynchronizing frame stream"
        );
        self.reset();
        self.resyncs += 1;
        debug!(resyncs = self.resyncs, "frame assembler reset");
    }
}
