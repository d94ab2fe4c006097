//! Advertising data (EIR) decoding.
//!
//! Advertising payloads are a sequence of records:
//!
//! ```text
//! <len> <type> <value: len-1 bytes> <len> <type> ...
//! ```
//!
//! A length of zero ends the sequence early. A record whose declared length
//! runs past the end of the buffer is dropped without error, keeping the
//! records decoded before it.

use std::collections::BTreeMap;

use crate::enums::EirDataType;

/// Decoded advertising records, keyed by raw type tag.
///
/// When a tag appears more than once, the last record wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EirPacket {
    records: BTreeMap<u8, Vec<u8>>,
}

impl EirPacket {
    /// Decode a record sequence.
    pub fn decode(data: &[u8]) -> Self {
        let mut records = BTreeMap::new();
        let mut pos = 0;
        while pos < data.len() {
            let len = data[pos] as usize;
            if len == 0 {
                break;
            }
            let start = pos + 1;
            let end = start + len;
            if end > data.len() {
                tracing::debug!(
                    declared = len,
                    available = data.len() - start,
                    "truncated EIR record dropped"
                );
                break;
            }
            records.insert(data[start], data[start + 1..end].to_vec());
            pos = end;
        }
        EirPacket { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Value of the record with the given type.
    pub fn get(&self, data_type: EirDataType) -> Option<&[u8]> {
        self.get_raw(data_type.raw())
    }

    /// Value of the record with the given raw tag.
    pub fn get_raw(&self, tag: u8) -> Option<&[u8]> {
        self.records.get(&tag).map(Vec::as_slice)
    }

    /// Records in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (EirDataType, &[u8])> {
        self.records
            .iter()
            .map(|(tag, value)| (EirDataType::from_raw(*tag), value.as_slice()))
    }

    /// Fold `other` into `self`; records in `other` replace records with
    /// the same tag.
    pub fn merge(&mut self, other: &EirPacket) {
        for (tag, value) in &other.records {
            self.records.insert(*tag, value.clone());
        }
    }

    /// Advertising flags byte.
    pub fn flags(&self) -> Option<u8> {
        self.get(EirDataType::Flags).and_then(|v| v.first().copied())
    }

    /// Device name, preferring the complete name over the shortened one.
    pub fn name(&self) -> Option<String> {
        self.get(EirDataType::NameLong)
            .or_else(|| self.get(EirDataType::NameShort))
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// Advertised transmit power in dBm.
    pub fn tx_power(&self) -> Option<i8> {
        self.get(EirDataType::TxPower)
            .and_then(|v| v.first().map(|b| *b as i8))
    }

    /// 16-bit service UUIDs, complete and incomplete lists combined.
    pub fn uuid16s(&self) -> Vec<u16> {
        [EirDataType::Uuid16Complete, EirDataType::Uuid16Incomplete]
            .into_iter()
            .filter_map(|t| self.get(t))
            .flat_map(|v| v.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])))
            .collect()
    }

    /// Manufacturer specific data as (company id, data).
    pub fn manufacturer_data(&self) -> Option<(u16, &[u8])> {
        let v = self.get(EirDataType::ManufacturerSpecific)?;
        if v.len() < 2 {
            return None;
        }
        Some((u16::from_le_bytes([v[0], v[1]]), &v[2..]))
    }
}
