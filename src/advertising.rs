use crate::error::Error;
use crate::mode::Mode;
use crate::record::{ConfigRecord, UUID_LEN};
use crate::settings::Settings;
use heapless::Vec;

/// Legacy advertising and scan response payloads are limited to 31 bytes.
pub const MAX_ADV_DATA_LEN: usize = 31;

/// Length of the manufacturer specific beacon block.
pub const BEACON_INFO_LEN: usize = 23;
/// Value of the length byte inside the beacon block: everything after the two header bytes.
const BEACON_DATA_LEN: u8 = (BEACON_INFO_LEN - 2) as u8;

const DEVICE_TYPE_OFFSET: usize = 0;
const DATA_LEN_OFFSET: usize = 1;
pub const UUID_OFFSET: usize = 2;
pub const MAJOR_OFFSET: usize = UUID_OFFSET + UUID_LEN;
pub const MINOR_OFFSET: usize = MAJOR_OFFSET + 2;
pub const RSSI_OFFSET: usize = MINOR_OFFSET + 2;

pub const FLAG_LE_LIMITED_DISC_MODE: u8 = 0x01;
pub const FLAG_LE_GENERAL_DISC_MODE: u8 = 0x02;
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

#[derive(strum::FromRepr, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdType {
    Flags = 0x01,
    CompleteServiceUuids128 = 0x07,
    CompleteLocalName = 0x09,
    Appearance = 0x19,
    ManufacturerSpecificData = 0xFF,
}

/// The transmit-ready copy of the beacon identity: device type, length, UUID, major, minor and
/// measured RSSI at fixed offsets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BeaconInfo([u8; BEACON_INFO_LEN]);

impl BeaconInfo {
    pub fn new(device_type: u8, record: &ConfigRecord) -> Self {
        let mut raw = [0u8; BEACON_INFO_LEN];
        raw[DEVICE_TYPE_OFFSET] = device_type;
        raw[DATA_LEN_OFFSET] = BEACON_DATA_LEN;
        raw[UUID_OFFSET..MAJOR_OFFSET].copy_from_slice(&record.beacon_uuid);
        raw[MAJOR_OFFSET..MINOR_OFFSET].copy_from_slice(&record.major);
        raw[MINOR_OFFSET..RSSI_OFFSET].copy_from_slice(&record.minor);
        raw[RSSI_OFFSET] = record.measured_rssi as u8;
        Self(raw)
    }

    /// Uses the default beacon device type.
    pub fn from_record(record: &ConfigRecord) -> Self {
        Self::new(Settings::DEFAULT.device_type, record)
    }

    pub fn as_bytes(&self) -> &[u8; BEACON_INFO_LEN] {
        &self.0
    }

    pub fn uuid(&self) -> &[u8] {
        &self.0[UUID_OFFSET..MAJOR_OFFSET]
    }

    pub fn major(&self) -> &[u8] {
        &self.0[MAJOR_OFFSET..MINOR_OFFSET]
    }

    pub fn minor(&self) -> &[u8] {
        &self.0[MINOR_OFFSET..RSSI_OFFSET]
    }

    pub fn measured_rssi(&self) -> i8 {
        self.0[RSSI_OFFSET] as i8
    }
}

/// A sequence of AD structures (`length`, `type`, `data`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvData(Vec<u8, MAX_ADV_DATA_LEN>);

impl AdvData {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends one AD structure whose data is the concatenation of `parts`.
    pub fn push(&mut self, ad_type: AdType, parts: &[&[u8]]) -> Result<(), Error> {
        let data_len: usize = parts.iter().map(|p| p.len()).sum();
        if data_len + 2 > MAX_ADV_DATA_LEN - self.0.len() {
            return Err(Error::AdvertisingDataTooLong);
        }

        // capacity was checked above
        let _ = self.0.push(data_len as u8 + 1);
        let _ = self.0.push(ad_type as u8);
        for part in parts {
            let _ = self.0.extend_from_slice(part);
        }
        Ok(())
    }

    /// Returns the data of the first structure of type `ad_type`.
    pub fn find(&self, ad_type: AdType) -> Option<&[u8]> {
        let mut rest = self.0.as_slice();
        while let [len, tail @ ..] = rest {
            let len = *len as usize;
            if len == 0 || len > tail.len() {
                return None;
            }
            let (structure, next) = tail.split_at(len);
            if structure[0] == ad_type as u8 {
                return Some(&structure[1..]);
            }
            rest = next;
        }
        None
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingKind {
    ConnectableUndirected,
    NonConnectableUndirected,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterPolicy {
    /// Accept scan and connect requests from any device.
    Any,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingParams {
    pub kind: AdvertisingKind,
    /// 0.625 ms units
    pub interval: u16,
    /// 0 means advertise until stopped
    pub timeout_s: u16,
    pub filter_policy: FilterPolicy,
}

/// Everything the radio needs to advertise in a given mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub mode: Mode,
    pub beacon_info: BeaconInfo,
    pub adv_data: AdvData,
    pub scan_data: AdvData,
    pub params: AdvertisingParams,
}

impl Advertisement {
    /// Assembles the advertisement for `mode`.
    ///
    /// Beacon mode broadcasts the beacon block as manufacturer specific data. Config mode
    /// advertises name and appearance and lists the provisioning service in the scan response;
    /// its beacon block is served by the provisioning service instead. The block itself is the
    /// same in both modes.
    pub fn for_mode(mode: Mode, record: &ConfigRecord, settings: &Settings) -> Result<Self, Error> {
        let beacon_info = BeaconInfo::new(settings.device_type, record);
        let mut adv_data = AdvData::new();
        let mut scan_data = AdvData::new();

        let params = match mode {
            Mode::Beacon => {
                adv_data.push(AdType::Flags, &[&[FLAG_BR_EDR_NOT_SUPPORTED]])?;
                adv_data.push(
                    AdType::ManufacturerSpecificData,
                    &[&settings.company_id.to_le_bytes(), beacon_info.as_bytes()],
                )?;
                AdvertisingParams {
                    kind: AdvertisingKind::NonConnectableUndirected,
                    interval: settings.beacon_adv_interval,
                    timeout_s: settings.beacon_adv_timeout_s,
                    filter_policy: FilterPolicy::Any,
                }
            }
            Mode::Config => {
                adv_data.push(
                    AdType::Flags,
                    &[&[FLAG_LE_LIMITED_DISC_MODE | FLAG_BR_EDR_NOT_SUPPORTED]],
                )?;
                adv_data.push(AdType::CompleteLocalName, &[settings.device_name.as_bytes()])?;
                adv_data.push(AdType::Appearance, &[&settings.appearance.to_le_bytes()])?;
                scan_data.push(AdType::CompleteServiceUuids128, &[&settings.service_uuid])?;
                AdvertisingParams {
                    kind: AdvertisingKind::ConnectableUndirected,
                    interval: settings.config_adv_interval,
                    timeout_s: settings.config_adv_timeout_s,
                    filter_policy: FilterPolicy::Any,
                }
            }
        };

        Ok(Self {
            mode,
            beacon_info,
            adv_data,
            scan_data,
            params,
        })
    }
}
