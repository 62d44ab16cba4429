use crate::error::Error;
use crate::platform::{AlignedOps, Platform};
use crate::record::{ConfigRecord, RECORD_LEN};
use crate::storage::{
    BlockHandle, BlockStorage, Completion, MAX_QUEUED_OPS, MAX_STORE_LEN, OpCode,
};
#[cfg(feature = "defmt")]
use defmt::{debug, info, warn};
use heapless::{Deque, Vec};

/// Every commit queues an erase and a store.
const MAX_STAGED: usize = MAX_QUEUED_OPS / 2;

/// Owns the single flash block holding the [`ConfigRecord`] and the in-memory copy of it.
///
/// All mutations go through [`ConfigStore::commit`], which always rewrites the complete record:
/// the block is erased and written again, there are no in-place field updates. A committed record
/// is staged until its store completes and only then becomes the durable [`ConfigStore::record`].
pub struct ConfigStore<T: Platform> {
    storage: BlockStorage<T>,
    handle: BlockHandle,
    defaults: ConfigRecord,
    record: ConfigRecord,
    staged: Deque<ConfigRecord, MAX_STAGED>,
}

impl<T: Platform> ConfigStore<T> {
    /// Size of the record in flash, padded to the flash write size.
    pub fn stored_len() -> usize {
        T::align_write_ceil(RECORD_LEN)
    }

    /// Registers the record block. The factory defaults are used when the block turns out to be
    /// blank.
    pub fn new(storage: BlockStorage<T>) -> Result<Self, Error> {
        Self::with_defaults(storage, ConfigRecord::default())
    }

    pub fn with_defaults(
        mut storage: BlockStorage<T>,
        mut defaults: ConfigRecord,
    ) -> Result<Self, Error> {
        let handle = storage.register(Self::stored_len(), 1)?;
        defaults.mark_valid();
        Ok(Self {
            storage,
            handle,
            defaults,
            record: defaults,
            staged: Deque::new(),
        })
    }

    /// Reads the record from flash.
    ///
    /// A blank or foreign block is replaced by the defaults. The defaults are committed and this
    /// call waits until the flash operations finished, so after `Ok` the block always holds a
    /// valid record.
    pub fn load(&mut self) -> Result<ConfigRecord, Error> {
        let mut raw = [0u8; RECORD_LEN];
        self.storage.load(&self.handle, &mut raw)?;
        let stored = ConfigRecord::from_bytes(&raw);

        if stored.is_valid() {
            #[cfg(feature = "defmt")]
            debug!("load: found valid record");
            self.record = stored;
            return Ok(stored);
        }

        #[cfg(feature = "defmt")]
        info!(
            "load: no valid record (marker {:#04x}), writing defaults",
            stored.validity_marker
        );

        let defaults = self.defaults;
        self.commit(defaults)?;
        self.wait_for_quiescence()?;
        Ok(defaults)
    }

    /// Queues an erase of the block followed by a write of the full record.
    ///
    /// `Ok` means both operations were accepted, not that they are durable. Completion is reported
    /// through [`ConfigStore::poll`] or awaited with [`ConfigStore::wait_for_quiescence`]. Between
    /// the erase and the write the block reads as blank. The record becomes visible through
    /// [`ConfigStore::latest`] right away and through [`ConfigStore::record`] once it is durable.
    pub fn commit(&mut self, record: ConfigRecord) -> Result<(), Error> {
        let len = Self::stored_len();
        let mut image: Vec<u8, MAX_STORE_LEN> = Vec::new();
        image
            .extend_from_slice(&record.to_bytes())
            .map_err(|_| Error::InvalidBlockSize)?;
        image
            .resize(len, 0xFF)
            .map_err(|_| Error::InvalidBlockSize)?;

        // an erase without its write would leave the block blank
        if self.storage.pending() + 2 > MAX_QUEUED_OPS {
            return Err(Error::StorageBusy);
        }

        #[cfg(feature = "defmt")]
        debug!("commit: {}", record);

        self.storage.erase(&self.handle, len)?;
        self.storage.store(&self.handle, &image, 0)?;
        // room for both ops implies room for the record
        self.staged
            .push_back(record)
            .map_err(|_| Error::StorageBusy)
    }

    /// The record as it is in flash: loaded at boot or committed and written since.
    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// The most recently committed record, durable or not.
    pub fn latest(&self) -> &ConfigRecord {
        self.staged.back().unwrap_or(&self.record)
    }

    /// Runs one queued flash operation. A successful store promotes its staged record, a failure
    /// discards every staged record.
    pub fn poll(&mut self) -> Option<Completion> {
        let completion = self.storage.poll()?;
        match (completion.op, completion.result) {
            (OpCode::Store, Ok(())) => {
                if let Some(record) = self.staged.pop_front() {
                    self.record = record;
                }
            }
            (_, Err(_e)) => {
                #[cfg(feature = "defmt")]
                warn!("commit failed: {}, keeping previous record", _e);
                self.staged.clear();
            }
            (OpCode::Erase, Ok(())) => {}
        }
        Some(completion)
    }

    /// Drains the queue through [`ConfigStore::poll`]. Returns the first failure observed.
    pub fn wait_for_quiescence(&mut self) -> Result<(), Error> {
        let mut outcome = Ok(());
        while let Some(completion) = self.poll() {
            if outcome.is_ok() {
                outcome = completion.result;
            }
        }
        outcome
    }

    pub fn is_quiescent(&self) -> bool {
        self.storage.is_quiescent()
    }

    pub fn storage(&self) -> &BlockStorage<T> {
        &self.storage
    }
}
