//! Devices seen during discovery, keyed by address.

use std::collections::HashMap;

use bgapi::BdAddr;
use bgapi::EirPacket;
use bgapi::enums::BluetoothAddressType;
use bgapi::packets::GapScanResponseEvent;

/// Everything learned about one advertiser.
#[derive(Debug, Clone)]
pub struct Device {
    pub address: BdAddr,
    pub address_type: BluetoothAddressType,
    /// RSSI of the most recent scan response.
    pub rssi: i8,
    /// Number of scan responses received.
    pub seen: u32,
    /// Advertising records merged across every response; newer wins.
    pub eir: EirPacket,
}

impl Device {
    pub fn name(&self) -> Option<String> {
        self.eir.name()
    }
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<BdAddr, Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a scan response into the registry. Returns `true` the first
    /// time an address is seen.
    pub fn update(&mut self, scan: &GapScanResponseEvent) -> bool {
        let eir = scan.eir();
        match self.devices.get_mut(&scan.sender) {
            Some(device) => {
                device.rssi = scan.rssi;
                device.address_type = scan.address_type;
                device.seen += 1;
                device.eir.merge(&eir);
                false
            }
            None => {
                self.devices.insert(
                    scan.sender,
                    Device {
                        address: scan.sender,
                        address_type: scan.address_type,
                        rssi: scan.rssi,
                        seen: 1,
                        eir,
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, address: &BdAddr) -> Option<&Device> {
        self.devices.get(address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices ordered by signal strength, strongest first.
    pub fn by_rssi(&self) -> Vec<&Device> {
        let mut devices: Vec<&Device> = self.devices.values().collect();
        devices.sort_by(|a, b| b.rssi.cmp(&a.rssi).then(a.address.cmp(&b.address)));
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgapi::enums::ScanResponseType;

    fn scan(sender: &str, rssi: i8, data: &[u8]) -> GapScanResponseEvent {
        GapScanResponseEvent {
            rssi,
            packet_type: ScanResponseType::ConnectableAdvertisement,
            sender: sender.parse().unwrap(),
            address_type: BluetoothAddressType::Public,
            bond: 0xFF,
            data: data.to_vec(),
        }
    }

    #[test]
    fn first_sighting_is_new() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.update(&scan("00:07:80:2D:9E:F2", -50, &[0x02, 0x01, 0x06])));
        assert!(!registry.update(&scan("00:07:80:2D:9E:F2", -55, &[])));
        assert_eq!(registry.len(), 1);

        let device = registry.get(&"00:07:80:2D:9E:F2".parse().unwrap()).unwrap();
        assert_eq!(device.seen, 2);
        assert_eq!(device.rssi, -55);
        assert_eq!(device.eir.flags(), Some(0x06));
    }

    #[test]
    fn advertising_data_merges_last_wins() {
        let mut registry = DeviceRegistry::new();
        registry.update(&scan("11:22:33:44:55:66", -60, &[0x02, 0x01, 0x06, 0x02, 0x08, b'a']));
        // A scan response carrying the complete name and a new short name.
        registry.update(&scan(
            "11:22:33:44:55:66",
            -61,
            &[0x02, 0x08, b'b', 0x04, 0x09, b'l', b'o', b'n'],
        ));

        let device = registry.get(&"11:22:33:44:55:66".parse().unwrap()).unwrap();
        assert_eq!(device.eir.len(), 3);
        assert_eq!(device.name().as_deref(), Some("lon"));
        assert_eq!(
            device.eir.get(bgapi::enums::EirDataType::NameShort),
            Some(&b"b"[..])
        );
    }

    #[test]
    fn ordered_strongest_first() {
        let mut registry = DeviceRegistry::new();
        registry.update(&scan("00:00:00:00:00:01", -80, &[]));
        registry.update(&scan("00:00:00:00:00:02", -40, &[]));
        registry.update(&scan("00:00:00:00:00:03", -60, &[]));

        let rssi: Vec<i8> = registry.by_rssi().iter().map(|d| d.rssi).collect();
        assert_eq!(rssi, vec![-40, -60, -80]);
    }
}
