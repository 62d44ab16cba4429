//! Core of a BLE beacon with a provisioning mode.
//!
//! At boot the config button decides between advertising as a plain beacon and advertising as a
//! connectable device that accepts new beacon parameters. The beacon identity (UUID, major,
//! minor and measured RSSI) lives in a single flash block that is validated by a marker byte,
//! initialized with factory defaults when blank, and always rewritten as a whole.
//!
//! The radio stack, the GPIOs and the flash driver stay outside of this crate and are reached
//! through [`radio::RadioStack`], [`radio::Board`], [`embedded_hal::digital::InputPin`] and
//! [`embedded_storage::nor_flash::NorFlash`].
//!
//! ```ignore
//! let storage = BlockStorage::new(flash, CONFIG_PAGE)?;
//! let mut beacon = Beacon::boot(storage, radio, board, &mut config_button, Settings::DEFAULT)?;
//! loop {
//!     match critical_section::with(|cs| BEACON.borrow_ref_mut(cs).process()) {
//!         Control::Idle => cortex_m::asm::wfe(),
//!         Control::Restart(_) => cortex_m::peripheral::SCB::sys_reset(),
//!     }
//! }
//! ```
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod advertising;
pub mod beacon;
pub mod error;
pub mod event;
pub mod indicator;
pub mod mode;
pub mod platform;
pub mod radio;
pub mod record;
pub mod settings;
pub mod storage;
pub mod store;
pub mod writer;

pub use advertising::{Advertisement, BeaconInfo};
pub use beacon::{Beacon, Control, RestartReason, State};
pub use error::Error;
pub use event::{Button, Event};
pub use mode::{Mode, select_mode};
pub use record::ConfigRecord;
pub use settings::Settings;
pub use storage::BlockStorage;
pub use store::ConfigStore;
pub use writer::{ConfigWrite, WriteKind, handle_write};
