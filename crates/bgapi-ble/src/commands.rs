//! Command builders.
//!
//! One function per supported command. Each returns a ready-to-send
//! [`Command`]; builders that take variable-length arrays return a
//! [`Result`] because the array may not fit in a frame.
//!
//! Class ids: 0 = system, 3 = connection, 4 = attribute client, 6 = GAP.

use bgapi_core::address::BdAddr;
use bgapi_core::codec::PacketWriter;
use bgapi_core::error::Result;

use crate::enums::{BluetoothAddressType, GapConnectableMode, GapDiscoverMode, GapDiscoverableMode};
use crate::frame::Command;

pub const CLASS_SYSTEM: u8 = 0x00;
pub const CLASS_CONNECTION: u8 = 0x03;
pub const CLASS_ATTCLIENT: u8 = 0x04;
pub const CLASS_GAP: u8 = 0x06;

fn build(class_id: u8, command_id: u8, f: impl FnOnce(&mut PacketWriter)) -> Command {
    let mut writer = PacketWriter::new();
    f(&mut writer);
    Command::fixed(class_id, command_id, writer.finish())
}

// ---------------------------------------------------------------
// System
// ---------------------------------------------------------------

/// Reset the module. No response is sent; the module emits a boot event
/// once it has restarted.
pub fn system_reset(boot_in_dfu: bool) -> Command {
    build(CLASS_SYSTEM, 0x00, |w| {
        w.put_bool(boot_in_dfu);
    })
}

/// Liveness check. The response carries no parameters.
pub fn system_hello() -> Command {
    Command::empty(CLASS_SYSTEM, 0x01)
}

/// Read the module's own device address.
pub fn system_address_get() -> Command {
    Command::empty(CLASS_SYSTEM, 0x02)
}

/// Read and reset the packet counters.
pub fn system_get_counters() -> Command {
    Command::empty(CLASS_SYSTEM, 0x05)
}

/// Read the maximum number of simultaneous connections.
pub fn system_get_connections() -> Command {
    Command::empty(CLASS_SYSTEM, 0x06)
}

/// Read the firmware and hardware version.
pub fn system_get_info() -> Command {
    Command::empty(CLASS_SYSTEM, 0x08)
}

// ---------------------------------------------------------------
// Connection
// ---------------------------------------------------------------

pub fn connection_disconnect(connection: u8) -> Command {
    build(CLASS_CONNECTION, 0x00, |w| {
        w.put_u8(connection);
    })
}

pub fn connection_get_rssi(connection: u8) -> Command {
    build(CLASS_CONNECTION, 0x01, |w| {
        w.put_u8(connection);
    })
}

/// Ask the module to re-send the connection status event.
pub fn connection_get_status(connection: u8) -> Command {
    build(CLASS_CONNECTION, 0x07, |w| {
        w.put_u8(connection);
    })
}

// ---------------------------------------------------------------
// Attribute client
// ---------------------------------------------------------------

/// Discover attribute groups of type `uuid` between `start` and `end`.
///
/// Results arrive as group-found events, followed by a procedure-completed
/// event.
pub fn attclient_read_by_group_type(
    connection: u8,
    start: u16,
    end: u16,
    uuid: &[u8],
) -> Result<Command> {
    let mut w = PacketWriter::new();
    w.put_u8(connection).put_u16(start).put_u16(end);
    w.put_u8_array(uuid)?;
    Command::from_writer(CLASS_ATTCLIENT, 0x01, w)
}

/// Read an attribute by handle. The value arrives as an attribute-value
/// event.
pub fn attclient_read_by_handle(connection: u8, chrhandle: u16) -> Command {
    build(CLASS_ATTCLIENT, 0x04, |w| {
        w.put_u8(connection).put_u16(chrhandle);
    })
}

pub fn attclient_attribute_write(connection: u8, atthandle: u16, data: &[u8]) -> Result<Command> {
    let mut w = PacketWriter::new();
    w.put_u8(connection).put_u16(atthandle);
    w.put_u8_array(data)?;
    Command::from_writer(CLASS_ATTCLIENT, 0x05, w)
}

// ---------------------------------------------------------------
// GAP
// ---------------------------------------------------------------

pub fn gap_set_mode(discover: GapDiscoverableMode, connect: GapConnectableMode) -> Command {
    build(CLASS_GAP, 0x01, |w| {
        w.put_u8(discover.raw()).put_u8(connect.raw());
    })
}

/// Start scanning. Advertisers are reported as scan-response events until
/// [`gap_end_procedure`] is sent.
pub fn gap_discover(mode: GapDiscoverMode) -> Command {
    build(CLASS_GAP, 0x02, |w| {
        w.put_u8(mode.raw());
    })
}

/// Connection parameters for [`gap_connect_direct`].
///
/// Intervals are in units of 1.25 ms, the supervision timeout in units of
/// 10 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectParams {
    pub conn_interval_min: u16,
    pub conn_interval_max: u16,
    pub timeout: u16,
    pub latency: u16,
}

impl Default for ConnectParams {
    fn default() -> Self {
        ConnectParams {
            conn_interval_min: 60,
            conn_interval_max: 100,
            timeout: 100,
            latency: 0,
        }
    }
}

/// Connect to a specific device.
///
/// Addresses typed by a user should go through [`BdAddr::parse_lenient`],
/// which maps malformed text to the zero address instead of failing.
pub fn gap_connect_direct(
    address: BdAddr,
    address_type: BluetoothAddressType,
    params: ConnectParams,
) -> Command {
    build(CLASS_GAP, 0x03, |w| {
        w.put_address(&address)
            .put_u8(address_type.raw())
            .put_u16(params.conn_interval_min)
            .put_u16(params.conn_interval_max)
            .put_u16(params.timeout)
            .put_u16(params.latency);
    })
}

/// Stop the current GAP procedure (scan or connection attempt).
pub fn gap_end_procedure() -> Command {
    Command::empty(CLASS_GAP, 0x04)
}

/// Set scan interval and window (units of 625 us) and active scanning.
pub fn gap_set_scan_parameters(scan_interval: u16, scan_window: u16, active: bool) -> Command {
    build(CLASS_GAP, 0x07, |w| {
        w.put_u16(scan_interval).put_u16(scan_window).put_bool(active);
    })
}
