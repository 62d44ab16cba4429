use crate::error::Error;
use crate::platform::{AlignedOps, Platform};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};
use heapless::{Deque, Vec};

/// Number of erase/store operations that may be outstanding at the same time.
pub const MAX_QUEUED_OPS: usize = 4;

/// Largest payload a single store operation can carry.
pub const MAX_STORE_LEN: usize = 64;

/// The kind of operation a [`Completion`] reports on.
#[derive(strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpCode {
    Erase,
    Store,
}

/// Identifies a registered block. Handles are only handed out by [`BlockStorage::register`], so
/// every handle points to a word aligned region that fits into the flash.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockHandle {
    address: u32,
    block_size: usize,
    block_count: usize,
    index: usize,
}

impl BlockHandle {
    /// Absolute flash address of the block.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the handle of the `n`-th block of the same registration.
    pub fn nth(&self, n: usize) -> Option<BlockHandle> {
        if n >= self.block_count {
            return None;
        }
        let first = self.address - (self.index * self.block_size) as u32;
        Some(BlockHandle {
            address: first + (n * self.block_size) as u32,
            index: n,
            ..*self
        })
    }
}

/// Outcome of a queued operation, reported once the flash driver finished it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    pub handle: BlockHandle,
    pub op: OpCode,
    pub result: Result<(), Error>,
    pub len: usize,
}

enum PendingKind {
    Erase { size: usize },
    Store { offset: usize, data: Vec<u8, MAX_STORE_LEN> },
}

struct PendingOp {
    handle: BlockHandle,
    kind: PendingKind,
}

/// Block oriented storage on top of a NOR flash.
///
/// Erase and store requests are only queued. The flash is touched when the owner drives the queue
/// with [`BlockStorage::poll`], which mirrors how a radio stack schedules flash access between
/// radio events and reports back through a completion event. Reads are synchronous.
///
/// The first failed operation faults the storage: the remaining queue is dropped and every later
/// request is rejected with [`Error::StorageFaulted`].
pub struct BlockStorage<T: Platform> {
    hal: T,
    next_free: u32,
    queue: Deque<PendingOp, MAX_QUEUED_OPS>,
    faulted: bool,
    completed: usize,
}

impl<T: Platform> BlockStorage<T> {
    /// Blocks are allocated upwards from `base_address`, which has to be aligned to a flash erase
    /// page. Flashes with a write size above [`MAX_STORE_LEN`] are rejected.
    pub fn new(hal: T, base_address: usize) -> Result<Self, Error> {
        if !base_address.is_multiple_of(T::ERASE_SIZE) {
            return Err(Error::InvalidBaseAddress);
        }
        if base_address >= hal.capacity() {
            return Err(Error::OutOfCapacity);
        }
        // a padded trailing word has to fit into a store payload
        if T::WRITE_SIZE > MAX_STORE_LEN {
            return Err(Error::UnsupportedWriteSize);
        }

        Ok(Self {
            hal,
            next_free: base_address as u32,
            queue: Deque::new(),
            faulted: false,
            completed: 0,
        })
    }

    /// Reserves `block_count` blocks of `block_size` bytes each. Every registration starts on its
    /// own erase page, so erasing one registration never touches another.
    pub fn register(&mut self, block_size: usize, block_count: usize) -> Result<BlockHandle, Error> {
        if block_size == 0 || block_count == 0 || !block_size.is_multiple_of(T::WRITE_SIZE) {
            return Err(Error::InvalidBlockSize);
        }

        let region = block_size
            .checked_mul(block_count)
            .map(T::align_erase_ceil)
            .ok_or(Error::OutOfCapacity)?;
        let start = self.next_free as usize;
        let end = start.checked_add(region).ok_or(Error::OutOfCapacity)?;
        if end > self.hal.capacity() {
            return Err(Error::OutOfCapacity);
        }

        #[cfg(feature = "defmt")]
        trace!(
            "register: @{:#08x} {} x {} bytes",
            start,
            block_count,
            block_size
        );

        self.next_free = end as u32;
        Ok(BlockHandle {
            address: start as u32,
            block_size,
            block_count,
            index: 0,
        })
    }

    /// Reads the start of the block into `bytes`.
    pub fn load(&mut self, handle: &BlockHandle, bytes: &mut [u8]) -> Result<(), Error> {
        if bytes.len() > handle.block_size {
            return Err(Error::InvalidBlockSize);
        }

        #[cfg(feature = "defmt")]
        trace!("load: @{:#08x}[{}]", handle.address, bytes.len());

        self.hal
            .read(handle.address, bytes)
            .map_err(|_| Error::FlashRead)
    }

    /// Queues an erase of the flash pages backing the first `size` bytes of the block.
    pub fn erase(&mut self, handle: &BlockHandle, size: usize) -> Result<(), Error> {
        if size == 0 || size > handle.block_size {
            return Err(Error::InvalidBlockSize);
        }
        self.enqueue(PendingOp {
            handle: *handle,
            kind: PendingKind::Erase { size },
        })
    }

    /// Queues a write of `bytes` at `offset` inside the block. A trailing partial word is padded
    /// with `0xFF`.
    pub fn store(&mut self, handle: &BlockHandle, bytes: &[u8], offset: usize) -> Result<(), Error> {
        if bytes.is_empty()
            || !offset.is_multiple_of(T::WRITE_SIZE)
            || offset + bytes.len() > handle.block_size
        {
            return Err(Error::InvalidBlockSize);
        }
        let data = Vec::from_slice(bytes).map_err(|_| Error::InvalidBlockSize)?;
        self.enqueue(PendingOp {
            handle: *handle,
            kind: PendingKind::Store { offset, data },
        })
    }

    fn enqueue(&mut self, op: PendingOp) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::StorageFaulted);
        }
        self.queue.push_back(op).map_err(|_| Error::StorageBusy)
    }

    /// Executes the oldest queued operation and reports its outcome. Returns `None` if nothing is
    /// outstanding.
    pub fn poll(&mut self) -> Option<Completion> {
        let op = self.queue.pop_front()?;
        let (op_code, len, result) = match &op.kind {
            PendingKind::Erase { size } => {
                let from = op.handle.address;
                let to = T::align_erase_ceil(from as usize + size) as u32;

                #[cfg(feature = "defmt")]
                trace!("erase: {:#08x} - {:#08x}", from, to);

                let result = self.hal.erase(from, to).map_err(|_| Error::FlashErase);
                (OpCode::Erase, *size, result)
            }
            PendingKind::Store { offset, data } => {
                let address = op.handle.address + *offset as u32;

                #[cfg(feature = "defmt")]
                trace!("store: @{:#08x}[{}]", address, data.len());

                let result =
                    write_aligned(&mut self.hal, address, data).map_err(|_| Error::FlashWrite);
                (OpCode::Store, data.len(), result)
            }
        };

        if result.is_err() {
            #[cfg(feature = "defmt")]
            warn!(
                "storage fault during {}, dropping {} queued ops",
                op_code,
                self.queue.len()
            );
            self.faulted = true;
            self.queue.clear();
        }
        self.completed += 1;

        Some(Completion {
            handle: op.handle,
            op: op_code,
            result,
            len,
        })
    }

    /// Blocks until no operation is outstanding. Returns the first failure that was observed
    /// while draining the queue.
    pub fn wait_for_quiescence(&mut self) -> Result<(), Error> {
        let mut outcome = Ok(());
        while let Some(completion) = self.poll() {
            if outcome.is_ok() {
                outcome = completion.result;
            }
        }
        outcome
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_quiescent(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Number of operations that ran to completion, failed ones included.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn flash(&self) -> &T {
        &self.hal
    }
}

#[inline(always)]
fn write_aligned<T: Platform>(hal: &mut T, offset: u32, bytes: &[u8]) -> Result<(), T::Error> {
    if bytes.len().is_multiple_of(T::WRITE_SIZE) {
        return hal.write(offset, bytes);
    }

    let pivot = T::align_write_floor(bytes.len());
    let (header, trailer) = bytes.split_at(pivot);
    if !header.is_empty() {
        hal.write(offset, header)?;
    }

    // erased flash already reads as all ones
    if trailer.iter().any(|&e| e != 0xFF) {
        // BlockStorage::new guarantees WRITE_SIZE <= MAX_STORE_LEN
        let mut buf = [0xFFu8; MAX_STORE_LEN];
        buf[..trailer.len()].copy_from_slice(trailer);
        let buf = &buf[..T::WRITE_SIZE];
        hal.write(offset + pivot as u32, buf)?;
    }
    Ok(())
}
