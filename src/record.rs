//! The beacon identity as it lives in flash.

/// Marks a record as written. Erased flash reads as `0xFF`, so it never matches.
pub const VALIDITY_MARKER: u8 = 0x42;

pub const UUID_LEN: usize = 16;

const MARKER_OFFSET: usize = 0;
const UUID_OFFSET: usize = MARKER_OFFSET + 1;
const MAJOR_OFFSET: usize = UUID_OFFSET + UUID_LEN;
const MINOR_OFFSET: usize = MAJOR_OFFSET + 2;
const RSSI_OFFSET: usize = MINOR_OFFSET + 2;

/// Size of the encoded record without padding.
pub const RECORD_LEN: usize = RSSI_OFFSET + 1;

/// Factory UUID written on first boot.
pub const DEFAULT_UUID: [u8; UUID_LEN] = [
    0x50, 0xDC, 0xB6, 0xF6, 0x91, 0x5A, 0x41, 0x42, 0xA6, 0xFE, 0xFD, 0xA7, 0xB4, 0x41, 0x86, 0x09,
];
pub const DEFAULT_MAJOR: [u8; 2] = [0x00, 0x07];
pub const DEFAULT_MINOR: [u8; 2] = [0x00, 0x05];
/// -84 dBm at one meter.
pub const DEFAULT_MEASURED_RSSI: i8 = 0xACu8 as i8;

/// The persisted beacon configuration.
///
/// `major` and `minor` are kept as raw byte pairs in transmit order; they are never interpreted
/// as integers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigRecord {
    pub validity_marker: u8,
    pub beacon_uuid: [u8; UUID_LEN],
    pub major: [u8; 2],
    pub minor: [u8; 2],
    pub measured_rssi: i8,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            validity_marker: VALIDITY_MARKER,
            beacon_uuid: DEFAULT_UUID,
            major: DEFAULT_MAJOR,
            minor: DEFAULT_MINOR,
            measured_rssi: DEFAULT_MEASURED_RSSI,
        }
    }
}

impl ConfigRecord {
    pub fn is_valid(&self) -> bool {
        self.validity_marker == VALIDITY_MARKER
    }

    pub fn mark_valid(&mut self) {
        self.validity_marker = VALIDITY_MARKER;
    }

    /// Decodes a record. The flash padding after [`RECORD_LEN`] is not part of `raw`.
    ///
    /// Decoding never fails; an erased or foreign block simply produces a record for which
    /// [`ConfigRecord::is_valid`] is false.
    pub fn from_bytes(raw: &[u8; RECORD_LEN]) -> Self {
        let mut beacon_uuid = [0u8; UUID_LEN];
        beacon_uuid.copy_from_slice(&raw[UUID_OFFSET..MAJOR_OFFSET]);
        Self {
            validity_marker: raw[MARKER_OFFSET],
            beacon_uuid,
            major: [raw[MAJOR_OFFSET], raw[MAJOR_OFFSET + 1]],
            minor: [raw[MINOR_OFFSET], raw[MINOR_OFFSET + 1]],
            measured_rssi: raw[RSSI_OFFSET] as i8,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut raw = [0u8; RECORD_LEN];
        raw[MARKER_OFFSET] = self.validity_marker;
        raw[UUID_OFFSET..MAJOR_OFFSET].copy_from_slice(&self.beacon_uuid);
        raw[MAJOR_OFFSET..MINOR_OFFSET].copy_from_slice(&self.major);
        raw[MINOR_OFFSET..RSSI_OFFSET].copy_from_slice(&self.minor);
        raw[RSSI_OFFSET] = self.measured_rssi as u8;
        raw
    }
}
