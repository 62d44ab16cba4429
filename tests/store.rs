mod common;

use beacon_config::error::Error;
use beacon_config::record::{ConfigRecord, RECORD_LEN, VALIDITY_MARKER};
use beacon_config::storage::BlockStorage;
use beacon_config::writer::{ConfigWrite, WriteKind, handle_write};
use beacon_config::ConfigStore;
use common::Operation::{Erase, Read, Write};
use common::{PAGE_SIZE, RECORD_SIZE};
use pretty_assertions::assert_eq;

fn custom_record() -> ConfigRecord {
    ConfigRecord {
        validity_marker: VALIDITY_MARKER,
        beacon_uuid: [0xA5; 16],
        major: [0x12, 0x34],
        minor: [0x56, 0x78],
        measured_rssi: -59,
    }
}

fn open<T: beacon_config::platform::Platform>(flash: T) -> ConfigStore<T> {
    ConfigStore::new(BlockStorage::new(flash, 0).unwrap()).unwrap()
}

mod load {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_record_is_returned_unchanged() {
        let mut flash = common::Flash::with_contents(2, &custom_record().to_bytes());

        let mut store = open(&mut flash);
        assert_eq!(store.load().unwrap(), custom_record());
        assert_eq!(*store.record(), custom_record());
        assert!(store.is_quiescent());
        drop(store);

        // no write side effect
        assert_eq!(
            flash.operations,
            vec![Read {
                offset: 0,
                len: RECORD_LEN
            }]
        );
    }

    #[test]
    fn blank_flash_is_initialized_with_defaults() {
        let mut flash = common::Flash::new(2);

        let mut store = open(&mut flash);
        assert_eq!(store.load().unwrap(), ConfigRecord::default());
        assert!(store.is_quiescent());
        drop(store);

        assert_eq!(
            flash.operations,
            vec![
                Read {
                    offset: 0,
                    len: RECORD_LEN
                },
                Erase {
                    offset: 0,
                    len: PAGE_SIZE
                },
                Write {
                    offset: 0,
                    len: RECORD_SIZE
                },
            ]
        );
        assert_eq!(&flash.buf[..RECORD_LEN], &ConfigRecord::default().to_bytes());
        // padding stays erased
        assert_eq!(&flash.buf[RECORD_LEN..RECORD_SIZE], &[0xFF, 0xFF]);
        flash.operations.clear();

        // the second boot finds the defaults and does not write again
        let mut store = open(&mut flash);
        let record = store.load().unwrap();
        assert!(record.is_valid());
        assert_eq!(record, ConfigRecord::default());
        drop(store);
        assert_eq!(flash.writes(), 0);
    }

    #[test]
    fn foreign_marker_is_treated_as_blank() {
        let mut corrupt = custom_record();
        corrupt.validity_marker = 0x00;
        let mut flash = common::Flash::with_contents(1, &corrupt.to_bytes());

        let mut store = open(&mut flash);
        assert_eq!(store.load().unwrap(), ConfigRecord::default());
    }

    #[test]
    fn custom_defaults() {
        let mut flash = common::Flash::new(1);
        let mut defaults = custom_record();
        defaults.validity_marker = 0;

        let storage = BlockStorage::new(&mut flash, 0).unwrap();
        let mut store = ConfigStore::with_defaults(storage, defaults).unwrap();

        // the marker is forced on the defaults
        assert_eq!(store.load().unwrap(), custom_record());
    }

    #[test]
    fn read_failure_is_reported() {
        let mut flash = common::Flash::new_with_fault(1, 0);

        let mut store = open(&mut flash);
        assert_eq!(store.load(), Err(Error::FlashRead));
    }

    #[test]
    fn failed_initialization_is_reported() {
        // read ok, erase ok, write fails
        let mut flash = common::Flash::new_with_fault(1, 2);

        let mut store = open(&mut flash);
        assert_eq!(store.load(), Err(Error::FlashWrite));
        assert!(store.storage().is_faulted());
    }
}

mod commit {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn always_erases_before_writing() {
        let mut flash = common::Flash::with_contents(1, &custom_record().to_bytes());

        let mut store = open(&mut flash);
        store.load().unwrap();
        store.commit(ConfigRecord::default()).unwrap();

        // queued only
        assert_eq!(store.storage().pending(), 2);
        assert_eq!(store.storage().flash().operations.len(), 1);

        store.wait_for_quiescence().unwrap();
        drop(store);

        assert_eq!(
            flash.operations[1..],
            [
                Erase {
                    offset: 0,
                    len: PAGE_SIZE
                },
                Write {
                    offset: 0,
                    len: RECORD_SIZE
                },
            ]
        );
        assert_eq!(&flash.buf[..RECORD_LEN], &ConfigRecord::default().to_bytes());
    }

    #[test]
    fn calibration_update_touches_only_calibration() {
        let mut flash = common::Flash::with_contents(1, &custom_record().to_bytes());
        let before = custom_record().to_bytes();

        let mut store = open(&mut flash);
        store.load().unwrap();
        let write = ConfigWrite::parse(WriteKind::MeasuredRssi, &[0xC4]).unwrap();
        let updated = handle_write(&mut store, &write).unwrap();
        store.wait_for_quiescence().unwrap();
        drop(store);

        assert_eq!(updated.measured_rssi, -60);
        let after = &flash.buf[..RECORD_LEN];
        assert_eq!(after[..RECORD_LEN - 1], before[..RECORD_LEN - 1]);
        assert_eq!(after[RECORD_LEN - 1], 0xC4);
    }

    #[test]
    fn record_is_promoted_once_written() {
        let mut flash = common::Flash::with_contents(1, &custom_record().to_bytes());

        let mut store = open(&mut flash);
        store.load().unwrap();
        store.commit(ConfigRecord::default()).unwrap();

        assert_eq!(*store.record(), custom_record());
        assert_eq!(*store.latest(), ConfigRecord::default());

        // erase
        store.poll().unwrap();
        assert_eq!(*store.record(), custom_record());

        // store
        store.poll().unwrap();
        assert_eq!(*store.record(), ConfigRecord::default());
        assert_eq!(store.poll(), None);
    }

    #[test]
    fn consecutive_writes_are_merged() {
        let mut flash = common::Flash::new(1);

        let mut store = open(&mut flash);
        store.load().unwrap();

        let uuid = ConfigWrite::parse(WriteKind::Uuid, &[0x77; 16]).unwrap();
        handle_write(&mut store, &uuid).unwrap();
        let ids = ConfigWrite::parse(WriteKind::MajorMinor, &[9, 8, 7, 6]).unwrap();
        handle_write(&mut store, &ids).unwrap();
        store.wait_for_quiescence().unwrap();
        drop(store);

        let mut store = open(&mut flash);
        let record = store.load().unwrap();
        assert_eq!(record.beacon_uuid, [0x77; 16]);
        assert_eq!(record.major, [9, 8]);
        assert_eq!(record.minor, [7, 6]);
        assert_eq!(record.measured_rssi, ConfigRecord::default().measured_rssi);
    }

    #[test]
    fn failed_write_after_erase_is_fatal() {
        // read #0, erase #1, write #2 fails
        let mut flash = common::Flash::new_with_fault(1, 2);
        flash.buf[..RECORD_LEN].copy_from_slice(&custom_record().to_bytes());

        let mut store = open(&mut flash);
        store.load().unwrap();
        let write = ConfigWrite::MeasuredRssi(-40);
        handle_write(&mut store, &write).unwrap();

        assert_eq!(store.wait_for_quiescence(), Err(Error::FlashWrite));
        assert!(store.storage().is_faulted());
        // the failed update is not reported as stored
        assert_eq!(*store.record(), custom_record());
        assert_eq!(*store.latest(), custom_record());
        assert_eq!(handle_write(&mut store, &write), Err(Error::StorageFaulted));
        drop(store);

        // the block was erased, the next boot falls back to the defaults
        flash.disable_faults();
        let mut store = open(&mut flash);
        assert_eq!(store.load().unwrap(), ConfigRecord::default());
    }

    #[test]
    fn commit_needs_room_for_erase_and_write() {
        let mut flash = common::Flash::new(1);

        let mut store = open(&mut flash);
        store.load().unwrap();
        store.commit(custom_record()).unwrap();
        store.commit(custom_record()).unwrap();

        assert_eq!(store.commit(custom_record()), Err(Error::StorageBusy));
        assert_eq!(store.storage().pending(), 4);
    }
}
