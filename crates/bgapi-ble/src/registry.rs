//! Packet type registry.
//!
//! Maps a [`PacketId`] to the function that decodes its payload. The
//! registry is assembled before the handler starts and is read-only from
//! then on: the IO task holds it behind an `Arc` and never mutates it.

use std::collections::HashMap;
use std::fmt;

use bgapi_core::error::{Error, Result};

use crate::frame::{Frame, PacketId};
use crate::packets::{Response, standard_decoders};

/// Decodes one frame payload into a typed packet.
pub type Decoder = fn(&[u8]) -> Result<Response>;

/// Lookup table from packet identity to decoder.
#[derive(Clone, Default)]
pub struct PacketRegistry {
    decoders: HashMap<PacketId, Decoder>,
}

impl PacketRegistry {
    /// An empty registry. Every frame will be reported as unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry holding every packet type in [`packets`](crate::packets).
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (id, decoder) in standard_decoders() {
            registry.register(id, decoder);
        }
        registry
    }

    /// Add or replace a decoder. Returns the decoder previously registered
    /// for `id`, if any.
    pub fn register(&mut self, id: PacketId, decoder: Decoder) -> Option<Decoder> {
        self.decoders.insert(id, decoder)
    }

    pub fn contains(&self, id: PacketId) -> bool {
        self.decoders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode a complete frame.
    ///
    /// Returns [`Error::UnknownPacket`] when no decoder is registered for the
    /// frame's identity, or the decoder's error (usually
    /// [`Error::Truncated`]) when the payload is malformed.
    pub fn decode(&self, frame: &Frame) -> Result<Response> {
        let id = frame.id();
        let decoder = self.decoders.get(&id).ok_or(Error::UnknownPacket {
            class_id: id.class_id,
            command_id: id.command_id,
            is_event: id.is_event,
        })?;
        decoder(&frame.payload)
    }
}

impl fmt::Debug for PacketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&PacketId> = self.decoders.keys().collect();
        ids.sort();
        f.debug_struct("PacketRegistry")
            .field("packets", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameAssembler;
    use crate::packets::{GapDiscoverResponse, SystemHelloResponse};

    fn frame(bytes: &[u8]) -> Frame {
        let mut frames = FrameAssembler::new().extend(bytes);
        assert_eq!(frames.len(), 1);
        frames.remove(0)
    }

    #[test]
    fn standard_registry_decodes_known_response() {
        let registry = PacketRegistry::standard();
        let rsp = registry.decode(&frame(&[0x00, 0x02, 0x06, 0x02, 0x00, 0x00])).unwrap();
        assert_eq!(
            rsp,
            Response::GapDiscover(GapDiscoverResponse {
                result: crate::enums::BgApiResponse::Success
            })
        );
    }

    #[test]
    fn event_bit_selects_event_decoder() {
        let registry = PacketRegistry::standard();
        // class 0 command 0 as an event is the boot event; as a response it
        // is unregistered (system reset has no response).
        let boot = [0x80, 0x0C, 0x00, 0x00, 1, 0, 4, 0, 0, 0, 0x33, 0x01, 3, 0, 1, 1];
        assert!(matches!(
            registry.decode(&frame(&boot)),
            Ok(Response::SystemBoot(_))
        ));
        let not_boot = [0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            registry.decode(&frame(&not_boot)),
            Err(Error::UnknownPacket {
                class_id: 0,
                command_id: 0,
                is_event: false
            })
        ));
    }

    #[test]
    fn unknown_packet_is_reported() {
        let registry = PacketRegistry::standard();
        let result = registry.decode(&frame(&[0x80, 0x00, 0x09, 0x09]));
        assert!(matches!(
            result,
            Err(Error::UnknownPacket {
                class_id: 9,
                command_id: 9,
                is_event: true
            })
        ));
    }

    #[test]
    fn short_payload_is_decode_failure() {
        let registry = PacketRegistry::standard();
        // get_info response with only two payload bytes.
        let result = registry.decode(&frame(&[0x00, 0x02, 0x00, 0x08, 0x01, 0x00]));
        assert!(matches!(result, Err(Error::Truncated { .. })));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let registry = PacketRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.decode(&frame(&[0x00, 0x00, 0x00, 0x01])).is_err());
    }

    #[test]
    fn register_replaces_existing_decoder() {
        let mut registry = PacketRegistry::standard();
        let before = registry.len();
        let id = SystemHelloResponse::ID;
        assert!(registry.contains(id));
        let previous = registry.register(id, |_| Err(Error::Protocol("rejected".into())));
        assert!(previous.is_some());
        assert_eq!(registry.len(), before);
        assert!(matches!(
            registry.decode(&frame(&[0x00, 0x00, 0x00, 0x01])),
            Err(Error::Protocol(_))
        ));
    }
}
