use crate::error::Error;
use crate::platform::Platform;
use crate::record::{ConfigRecord, UUID_LEN};
use crate::store::ConfigStore;
#[cfg(feature = "defmt")]
use defmt::info;

/// Field group addressed by a write to the provisioning service. The discriminant is the tag
/// used by the service.
#[derive(strum::FromRepr, strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WriteKind {
    MajorMinor = 0,
    MeasuredRssi = 1,
    Uuid = 2,
}

impl WriteKind {
    /// Number of payload bytes the field group consumes.
    pub const fn payload_len(&self) -> usize {
        match self {
            WriteKind::MajorMinor => 4,
            WriteKind::MeasuredRssi => 1,
            WriteKind::Uuid => UUID_LEN,
        }
    }
}

impl TryFrom<u8> for WriteKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        WriteKind::from_repr(value).ok_or(Error::UnknownWriteKind(value))
    }
}

/// A typed update of one field group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigWrite {
    MajorMinor { major: [u8; 2], minor: [u8; 2] },
    MeasuredRssi(i8),
    Uuid([u8; UUID_LEN]),
}

impl ConfigWrite {
    /// Builds an update from the raw characteristic value. Bytes beyond the field group's length
    /// are ignored.
    pub fn parse(kind: WriteKind, data: &[u8]) -> Result<Self, Error> {
        let expected = kind.payload_len();
        let Some(data) = data.get(..expected) else {
            return Err(Error::InvalidWriteLength {
                expected,
                actual: data.len(),
            });
        };

        Ok(match kind {
            WriteKind::MajorMinor => ConfigWrite::MajorMinor {
                major: [data[0], data[1]],
                minor: [data[2], data[3]],
            },
            WriteKind::MeasuredRssi => ConfigWrite::MeasuredRssi(data[0] as i8),
            WriteKind::Uuid => {
                let mut uuid = [0u8; UUID_LEN];
                uuid.copy_from_slice(data);
                ConfigWrite::Uuid(uuid)
            }
        })
    }

    pub fn kind(&self) -> WriteKind {
        match self {
            ConfigWrite::MajorMinor { .. } => WriteKind::MajorMinor,
            ConfigWrite::MeasuredRssi(_) => WriteKind::MeasuredRssi,
            ConfigWrite::Uuid(_) => WriteKind::Uuid,
        }
    }

    /// Returns a copy of `record` with only this field group replaced and the validity marker
    /// set.
    pub fn apply(&self, record: &ConfigRecord) -> ConfigRecord {
        let mut updated = *record;
        match *self {
            ConfigWrite::MajorMinor { major, minor } => {
                updated.major = major;
                updated.minor = minor;
            }
            ConfigWrite::MeasuredRssi(rssi) => updated.measured_rssi = rssi,
            ConfigWrite::Uuid(uuid) => updated.beacon_uuid = uuid,
        }
        updated.mark_valid();
        updated
    }
}

/// Merges `write` into the store's newest record and commits the result.
///
/// The commit is only queued; leaving config mode (and with it waiting for the flash) is up to
/// the connection lifecycle.
pub fn handle_write<T: Platform>(
    store: &mut ConfigStore<T>,
    write: &ConfigWrite,
) -> Result<ConfigRecord, Error> {
    let updated = write.apply(store.latest());

    #[cfg(feature = "defmt")]
    info!("config write: {}", write.kind());

    store.commit(updated)?;
    Ok(updated)
}
