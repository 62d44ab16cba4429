#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use beacon_config::error::StackError;
use beacon_config::indicator::LedMask;
use beacon_config::radio::{Board, ConnHandle, EncryptionInfo, RadioStack};
use beacon_config::settings::{ConnectionParams, SecurityParams};
use beacon_config::advertising::{AdvData, AdvertisingParams, BeaconInfo};
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

/// nRF51 flash page
pub const PAGE_SIZE: usize = 1024;
pub const WORD_SIZE: usize = 4;
/// Encoded record padded to a word
pub const RECORD_SIZE: usize = 24;

#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    pub fn new(pages: usize) -> Self {
        Self {
            buf: vec![0xffu8; PAGE_SIZE * pages],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    /// Every operation starting with the `fail_after_operation`-th (zero based) fails.
    pub fn new_with_fault(pages: usize, fail_after_operation: usize) -> Self {
        Self {
            fail_after_operation,
            ..Self::new(pages)
        }
    }

    /// A flash whose first page already holds `raw` at offset 0.
    pub fn with_contents(pages: usize, raw: &[u8]) -> Self {
        let mut flash = Self::new(pages);
        flash.buf[..raw.len()].copy_from_slice(raw);
        flash
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. } | Operation::Erase { .. }))
            .count()
    }

    fn check_fault(&self) -> Result<(), FlashError> {
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        println!(
            "    flash: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        self.check_fault()?;
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = PAGE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!(
            "    flash: erase: {from:04X} - {to:04X} #{:>2}",
            self.operations.len()
        );
        self.check_fault()?;
        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        self.buf[from as usize..to as usize].fill(0xff);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE));
        assert!(!bytes.is_empty());

        println!(
            "    flash: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        self.check_fault()?;
        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        for (i, &val) in bytes.iter().enumerate() {
            // NOR flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

/// Active low button.
pub struct Pin {
    pub pressed: bool,
}

impl Pin {
    pub fn pressed() -> Self {
        Self { pressed: true }
    }

    pub fn released() -> Self {
        Self { pressed: false }
    }
}

impl embedded_hal::digital::ErrorType for Pin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pressed)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pressed)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum RadioCall {
    SetDeviceName(String),
    SetPreferredConnParams(ConnectionParams),
    RegisterProvisioningService(BeaconInfo),
    SetAdvertisingData { adv: Vec<u8>, scan: Vec<u8> },
    StartAdvertising(AdvertisingParams),
    ReplySecurityParams(ConnHandle, SecurityParams),
    ReplySecurityInfo(ConnHandle, Option<EncryptionInfo>),
    SetSystemAttributes(ConnHandle),
    Disconnect(ConnHandle, u8),
}

/// Error code handed out by a failing [`Radio`].
pub const STACK_ERROR: StackError = StackError(0x08);

/// Records every call. Calls starting with the `fail_after_call`-th (zero based) fail.
pub struct Radio {
    pub calls: Vec<RadioCall>,
    pub fail_after_call: usize,
}

impl Default for Radio {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            fail_after_call: usize::MAX,
        }
    }
}

impl Radio {
    pub fn new_with_fault(fail_after_call: usize) -> Self {
        Self {
            fail_after_call,
            ..Default::default()
        }
    }

    fn record(&mut self, call: RadioCall) -> Result<(), StackError> {
        if self.calls.len() >= self.fail_after_call {
            return Err(STACK_ERROR);
        }
        self.calls.push(call);
        Ok(())
    }
}

impl RadioStack for Radio {
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        self.record(RadioCall::SetDeviceName(name.to_string()))
    }

    fn set_preferred_conn_params(&mut self, params: &ConnectionParams) -> Result<(), StackError> {
        self.record(RadioCall::SetPreferredConnParams(*params))
    }

    fn register_provisioning_service(&mut self, info: &BeaconInfo) -> Result<(), StackError> {
        self.record(RadioCall::RegisterProvisioningService(*info))
    }

    fn set_advertising_data(&mut self, adv: &AdvData, scan: &AdvData) -> Result<(), StackError> {
        self.record(RadioCall::SetAdvertisingData {
            adv: adv.as_bytes().to_vec(),
            scan: scan.as_bytes().to_vec(),
        })
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), StackError> {
        self.record(RadioCall::StartAdvertising(*params))
    }

    fn reply_security_params(
        &mut self,
        conn: ConnHandle,
        params: &SecurityParams,
    ) -> Result<(), StackError> {
        self.record(RadioCall::ReplySecurityParams(conn, *params))
    }

    fn reply_security_info(
        &mut self,
        conn: ConnHandle,
        info: Option<&EncryptionInfo>,
    ) -> Result<(), StackError> {
        self.record(RadioCall::ReplySecurityInfo(conn, info.copied()))
    }

    fn set_system_attributes(&mut self, conn: ConnHandle) -> Result<(), StackError> {
        self.record(RadioCall::SetSystemAttributes(conn))
    }

    fn disconnect(&mut self, conn: ConnHandle, reason: u8) -> Result<(), StackError> {
        self.record(RadioCall::Disconnect(conn, reason))
    }
}

#[derive(Default)]
pub struct Leds {
    pub changes: Vec<(LedMask, bool)>,
    pub timer_starts: Vec<u32>,
}

impl Board for Leds {
    fn set_leds(&mut self, mask: LedMask, lit: bool) {
        self.changes.push((mask, lit));
    }

    fn start_indicator_timer(&mut self, ticks: u32) -> Result<(), StackError> {
        self.timer_starts.push(ticks);
        Ok(())
    }
}
