use crate::record::ConfigRecord;

/// Converts milliseconds into units of `unit_us` microseconds, truncating like the radio stack
/// does.
pub const fn ms_to_units(ms: u32, unit_us: u32) -> u16 {
    (ms * 1000 / unit_us) as u16
}

const UNIT_0_625_MS: u32 = 625;
const UNIT_1_25_MS: u32 = 1250;
const UNIT_10_MS: u32 = 10000;

/// GAP appearance value "Generic Tag".
pub const APPEARANCE_GENERIC_TAG: u16 = 512;

/// Preferred peripheral connection parameters, in radio stack units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionParams {
    /// 1.25 ms units
    pub min_interval: u16,
    /// 1.25 ms units
    pub max_interval: u16,
    pub slave_latency: u16,
    /// 10 ms units
    pub supervision_timeout: u16,
}

/// Pairing parameters sent in reply to a security request. Bonding and MITM protection are off;
/// the provisioning link only needs an encrypted channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SecurityParams {
    pub timeout_s: u16,
    pub bond: bool,
    pub mitm: bool,
    pub io_caps: IoCapabilities,
    pub oob: bool,
    pub min_key_size: u8,
    pub max_key_size: u8,
}

#[derive(strum::FromRepr, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IoCapabilities {
    DisplayOnly = 0x00,
    DisplayYesNo = 0x01,
    KeyboardOnly = 0x02,
    NoInputNoOutput = 0x03,
    KeyboardDisplay = 0x04,
}

/// Device constants. `Settings::DEFAULT` reproduces the shipped firmware; boards that need other
/// values copy it and override fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Bluetooth SIG company identifier placed in front of the beacon block.
    pub company_id: u16,
    /// Device type byte at the start of the beacon block.
    pub device_type: u8,
    /// Name advertised in config mode.
    pub device_name: &'static str,
    pub appearance: u16,
    /// 128-bit UUID of the provisioning service, little endian as sent over the air.
    pub service_uuid: [u8; 16],
    /// 0.625 ms units
    pub beacon_adv_interval: u16,
    /// 0 disables the timeout
    pub beacon_adv_timeout_s: u16,
    /// 0.625 ms units
    pub config_adv_interval: u16,
    pub config_adv_timeout_s: u16,
    pub connection: ConnectionParams,
    pub security: SecurityParams,
    /// Record written when the flash holds no valid configuration.
    pub default_record: ConfigRecord,
}

impl Settings {
    pub const DEFAULT: Settings = Settings {
        company_id: 0x0059,
        device_type: 0x02,
        device_name: "Beacon Config",
        appearance: APPEARANCE_GENERIC_TAG,
        service_uuid: [
            0x23, 0xD1, 0xBC, 0xEA, 0x5F, 0x78, 0x23, 0x15, 0xDE, 0xEF, 0x12, 0x12, 0x00, 0x00,
            0x00, 0x00,
        ],
        beacon_adv_interval: ms_to_units(851, UNIT_0_625_MS),
        beacon_adv_timeout_s: 0,
        config_adv_interval: ms_to_units(851, UNIT_0_625_MS),
        config_adv_timeout_s: 30,
        connection: ConnectionParams {
            min_interval: ms_to_units(30, UNIT_1_25_MS),
            max_interval: ms_to_units(300, UNIT_1_25_MS),
            slave_latency: 0,
            supervision_timeout: ms_to_units(4000, UNIT_10_MS),
        },
        security: SecurityParams {
            timeout_s: 30,
            bond: false,
            mitm: false,
            io_caps: IoCapabilities::NoInputNoOutput,
            oob: false,
            min_key_size: 7,
            max_key_size: 16,
        },
        default_record: ConfigRecord {
            validity_marker: crate::record::VALIDITY_MARKER,
            beacon_uuid: crate::record::DEFAULT_UUID,
            major: crate::record::DEFAULT_MAJOR,
            minor: crate::record::DEFAULT_MINOR,
            measured_rssi: crate::record::DEFAULT_MEASURED_RSSI,
        },
    };
}

impl Default for Settings {
    fn default() -> Self {
        Self::DEFAULT
    }
}
