use thiserror::Error;

/// Status code reported by the radio stack for a failed call. The value is passed through untouched
/// so that it can be correlated with the vendor's error tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackError(pub u32);

/// Errors that can occur while running the beacon core. Apart from `InvalidWriteLength` and
/// `UnknownWriteKind`, which reject a single malformed request, every variant is fatal for the
/// running session and ends in a restart.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The storage base address has to be aligned to the flash erase size
    #[error("invalid storage base address")]
    InvalidBaseAddress,

    /// Block sizes have to be non-zero multiples of the flash write size
    #[error("invalid block size")]
    InvalidBlockSize,

    /// The flash write size exceeds the largest payload a store operation carries
    #[error("unsupported flash write size")]
    UnsupportedWriteSize,

    /// The registered blocks do not fit into the flash
    #[error("storage out of capacity")]
    OutOfCapacity,

    /// The flash driver reported an error while reading
    #[error("flash read failed")]
    FlashRead,

    /// The flash driver reported an error while erasing
    #[error("flash erase failed")]
    FlashErase,

    /// The flash driver reported an error while writing
    #[error("flash write failed")]
    FlashWrite,

    /// Too many storage operations are queued
    #[error("storage busy")]
    StorageBusy,

    /// A previous storage operation failed, no further operations are accepted
    #[error("storage faulted")]
    StorageFaulted,

    /// A configuration write carried fewer bytes than its field group needs
    #[error("invalid write length: expected {expected}, got {actual}")]
    InvalidWriteLength { expected: usize, actual: usize },

    /// The provisioning service delivered an unknown field group tag
    #[error("unknown write kind: {0}")]
    UnknownWriteKind(u8),

    /// Advertising or scan response data exceeds 31 bytes
    #[error("advertising data too long")]
    AdvertisingDataTooLong,

    /// The mode selection pin could not be read
    #[error("input pin error")]
    InputPin,

    /// A radio stack call returned a non-zero status
    #[error("radio stack error: {0:?}")]
    Stack(StackError),

    /// The event queue overflowed
    #[error("event queue full")]
    EventQueueFull,
}

impl From<StackError> for Error {
    fn from(value: StackError) -> Self {
        Error::Stack(value)
    }
}
