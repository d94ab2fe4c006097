//! Typed responses and events.
//!
//! Each packet type is a plain struct whose fields are decoded in wire order
//! with [`PacketReader`]. Trailing bytes beyond the known fields are ignored
//! so that newer firmware appending parameters still decodes; a payload
//! shorter than the fields require fails with [`Error::Truncated`].
//!
//! [`Response`] is the tagged union of every packet type the driver knows
//! about, and is what the handler hands to waiters and event listeners.

use bgapi_core::address::BdAddr;
use bgapi_core::codec::PacketReader;
use bgapi_core::error::Result;

use crate::eir::EirPacket;
use crate::enums::{
    BgApiResponse, BluetoothAddressType, ConnectionStatusFlags, ScanResponseType,
};
use crate::frame::PacketId;
use crate::registry::Decoder;

/// A field type that can be read from a payload.
pub trait FromWire: Sized {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self>;
}

impl FromWire for u8 {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u8()
    }
}

impl FromWire for i8 {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_i8()
    }
}

impl FromWire for u16 {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u16()
    }
}

impl FromWire for u32 {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u32()
    }
}

impl FromWire for bool {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_bool()
    }
}

/// `uint8array`: length-prefixed bytes.
impl FromWire for Vec<u8> {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u8_array()
    }
}

impl FromWire for BdAddr {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_address()
    }
}

impl FromWire for BgApiResponse {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u16().map(BgApiResponse::from_raw)
    }
}

impl FromWire for BluetoothAddressType {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u8().map(BluetoothAddressType::from_raw)
    }
}

impl FromWire for ScanResponseType {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u8().map(ScanResponseType::from_raw)
    }
}

impl FromWire for ConnectionStatusFlags {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        reader.read_u8().map(ConnectionStatusFlags::from_bits)
    }
}

macro_rules! packets {
    ($(
        $(#[$meta:meta])*
        $variant:ident($name:ident) = $kind:ident($class:literal, $command:literal) {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    )+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct $name {
                $( $(#[$fmeta])* pub $field: $ty, )*
            }

            impl $name {
                pub const ID: PacketId = PacketId::$kind($class, $command);

                /// Decode from a frame payload.
                #[allow(unused_mut, unused_variables)]
                pub fn decode(payload: &[u8]) -> Result<Self> {
                    let mut reader = PacketReader::new(payload);
                    Ok($name {
                        $( $field: FromWire::read(&mut reader)?, )*
                    })
                }
            }
        )+

        /// Every decoded inbound packet.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Response {
            $( $variant($name), )+
        }

        impl Response {
            /// Identity of the packet type.
            pub fn id(&self) -> PacketId {
                match self {
                    $( Response::$variant(_) => $name::ID, )+
                }
            }

            /// Name of the packet type, for diagnostics.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Response::$variant(_) => stringify!($variant), )+
                }
            }
        }

        /// Decoders for every packet type above.
        pub(crate) fn standard_decoders() -> Vec<(PacketId, Decoder)> {
            vec![
                $(
                    {
                        let decoder: Decoder =
                            |payload: &[u8]| Ok(Response::$variant($name::decode(payload)?));
                        ($name::ID, decoder)
                    },
                )+
            ]
        }
    };
}

packets! {
    // -- system --------------------------------------------------------

    SystemHello(SystemHelloResponse) = response(0x00, 0x01) {}

    SystemAddressGet(SystemAddressGetResponse) = response(0x00, 0x02) {
        address: BdAddr,
    }

    /// Packet counters since the previous read.
    SystemGetCounters(SystemGetCountersResponse) = response(0x00, 0x05) {
        txok: u8,
        txretry: u8,
        rxok: u8,
        rxfail: u8,
        /// Free memory buffers.
        mbuf: u8,
    }

    SystemGetConnections(SystemGetConnectionsResponse) = response(0x00, 0x06) {
        maxconn: u8,
    }

    SystemGetInfo(SystemGetInfoResponse) = response(0x00, 0x08) {
        major: u16,
        minor: u16,
        patch: u16,
        build: u16,
        ll_version: u16,
        protocol_version: u8,
        hw: u8,
    }

    /// Sent by the module after power-up or reset.
    SystemBoot(SystemBootEvent) = event(0x00, 0x00) {
        major: u16,
        minor: u16,
        patch: u16,
        build: u16,
        ll_version: u16,
        protocol_version: u8,
        hw: u8,
    }

    // -- connection ----------------------------------------------------

    ConnectionDisconnect(ConnectionDisconnectResponse) = response(0x03, 0x00) {
        connection: u8,
        result: BgApiResponse,
    }

    ConnectionGetRssi(ConnectionGetRssiResponse) = response(0x03, 0x01) {
        connection: u8,
        /// dBm, valid range -103..-38.
        rssi: i8,
    }

    ConnectionGetStatus(ConnectionGetStatusResponse) = response(0x03, 0x07) {
        connection: u8,
    }

    ConnectionStatus(ConnectionStatusEvent) = event(0x03, 0x00) {
        connection: u8,
        flags: ConnectionStatusFlags,
        address: BdAddr,
        address_type: BluetoothAddressType,
        /// Units of 1.25 ms.
        conn_interval: u16,
        /// Supervision timeout, units of 10 ms.
        timeout: u16,
        latency: u16,
        /// Bond handle, 0xFF when not bonded.
        bonding: u8,
    }

    ConnectionVersionInd(ConnectionVersionIndEvent) = event(0x03, 0x01) {
        connection: u8,
        vers_nr: u8,
        comp_id: u16,
        sub_vers_nr: u16,
    }

    ConnectionDisconnected(ConnectionDisconnectedEvent) = event(0x03, 0x04) {
        connection: u8,
        reason: BgApiResponse,
    }

    // -- attribute client ----------------------------------------------

    AttClientReadByGroupType(AttClientReadByGroupTypeResponse) = response(0x04, 0x01) {
        connection: u8,
        result: BgApiResponse,
    }

    AttClientReadByHandle(AttClientReadByHandleResponse) = response(0x04, 0x04) {
        connection: u8,
        result: BgApiResponse,
    }

    AttClientAttributeWrite(AttClientAttributeWriteResponse) = response(0x04, 0x05) {
        connection: u8,
        result: BgApiResponse,
    }

    AttClientProcedureCompleted(AttClientProcedureCompletedEvent) = event(0x04, 0x01) {
        connection: u8,
        result: BgApiResponse,
        chrhandle: u16,
    }

    AttClientGroupFound(AttClientGroupFoundEvent) = event(0x04, 0x02) {
        connection: u8,
        start: u16,
        end: u16,
        uuid: Vec<u8>,
    }

    AttClientFindInformationFound(AttClientFindInformationFoundEvent) = event(0x04, 0x04) {
        connection: u8,
        chrhandle: u16,
        uuid: Vec<u8>,
    }

    AttClientAttributeValue(AttClientAttributeValueEvent) = event(0x04, 0x05) {
        connection: u8,
        atthandle: u16,
        value_type: u8,
        value: Vec<u8>,
    }

    // -- GAP -----------------------------------------------------------

    GapSetMode(GapSetModeResponse) = response(0x06, 0x01) {
        result: BgApiResponse,
    }

    GapDiscover(GapDiscoverResponse) = response(0x06, 0x02) {
        result: BgApiResponse,
    }

    GapConnectDirect(GapConnectDirectResponse) = response(0x06, 0x03) {
        result: BgApiResponse,
        connection_handle: u8,
    }

    GapEndProcedure(GapEndProcedureResponse) = response(0x06, 0x04) {
        result: BgApiResponse,
    }

    GapSetScanParameters(GapSetScanParametersResponse) = response(0x06, 0x07) {
        result: BgApiResponse,
    }

    /// One advertisement or scan response heard while discovering.
    GapScanResponse(GapScanResponseEvent) = event(0x06, 0x00) {
        rssi: i8,
        packet_type: ScanResponseType,
        sender: BdAddr,
        address_type: BluetoothAddressType,
        bond: u8,
        /// Raw advertising data; see [`GapScanResponseEvent::eir`].
        data: Vec<u8>,
    }
}

impl Response {
    /// Returns `true` for unsolicited events.
    pub fn is_event(&self) -> bool {
        self.id().is_event
    }

    /// The result code, for packets that carry one.
    pub fn result(&self) -> Option<BgApiResponse> {
        match self {
            Response::ConnectionDisconnect(r) => Some(r.result),
            Response::AttClientReadByGroupType(r) => Some(r.result),
            Response::AttClientReadByHandle(r) => Some(r.result),
            Response::AttClientAttributeWrite(r) => Some(r.result),
            Response::AttClientProcedureCompleted(r) => Some(r.result),
            Response::GapSetMode(r) => Some(r.result),
            Response::GapDiscover(r) => Some(r.result),
            Response::GapConnectDirect(r) => Some(r.result),
            Response::GapEndProcedure(r) => Some(r.result),
            Response::GapSetScanParameters(r) => Some(r.result),
            _ => None,
        }
    }
}

impl SystemGetInfoResponse {
    /// Firmware version as `major.minor.patch build N`.
    pub fn version(&self) -> String {
        format!(
            "{}.{}.{} build {}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl SystemBootEvent {
    pub fn version(&self) -> String {
        format!(
            "{}.{}.{} build {}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl GapScanResponseEvent {
    /// Decode the advertising data records.
    pub fn eir(&self) -> EirPacket {
        EirPacket::decode(&self.data)
    }
}
