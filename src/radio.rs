use crate::advertising::{AdvData, AdvertisingParams, BeaconInfo};
use crate::error::StackError;
use crate::indicator::LedMask;
use crate::settings::{ConnectionParams, SecurityParams};

/// Connection handle assigned by the radio stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// Encryption key material distributed during pairing, kept for the lifetime of the connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncryptionInfo {
    pub ltk: [u8; 16],
    pub div: u16,
    pub auth: bool,
}

/// HCI reason "unacceptable connection parameters".
pub const HCI_CONN_INTERVAL_UNACCEPTABLE: u8 = 0x3B;

/// The parts of the BLE stack the beacon drives. Every call reports the stack's status; any
/// failure is fatal for the session.
pub trait RadioStack {
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError>;

    fn set_preferred_conn_params(&mut self, params: &ConnectionParams) -> Result<(), StackError>;

    /// Registers the provisioning service exposing the current beacon block. Field writes come
    /// back as [`crate::event::Event::ConfigWrite`].
    fn register_provisioning_service(&mut self, info: &BeaconInfo) -> Result<(), StackError>;

    fn set_advertising_data(&mut self, adv: &AdvData, scan: &AdvData) -> Result<(), StackError>;

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), StackError>;

    fn reply_security_params(
        &mut self,
        conn: ConnHandle,
        params: &SecurityParams,
    ) -> Result<(), StackError>;

    /// `None` tells the peer that no keys are stored for it.
    fn reply_security_info(
        &mut self,
        conn: ConnHandle,
        info: Option<&EncryptionInfo>,
    ) -> Result<(), StackError>;

    /// Called when the stack asks for persisted system attributes; the beacon has none.
    fn set_system_attributes(&mut self, conn: ConnHandle) -> Result<(), StackError>;

    fn disconnect(&mut self, conn: ConnHandle, reason: u8) -> Result<(), StackError>;
}

/// Board level peripherals besides the radio.
pub trait Board {
    /// LEDs are active low; `lit` abstracts over that.
    fn set_leds(&mut self, mask: LedMask, lit: bool);

    /// (Re)starts the single-shot indicator timer. Expiry is reported as
    /// [`crate::event::Event::IndicatorTimeout`].
    fn start_indicator_timer(&mut self, ticks: u32) -> Result<(), StackError>;
}
