use embedded_storage::nor_flash::NorFlash;

/// Any NOR flash driver can back the beacon storage. On the target this is the chip's flash
/// peripheral (or a wrapper that hands work to the radio stack's flash scheduler), in tests it is
/// a RAM-backed mock.
pub trait Platform: NorFlash {}

impl<T: NorFlash> Platform for T {}

pub trait AlignedOps: Platform {
    fn align_write_ceil(size: usize) -> usize {
        align_ceil(size, Self::WRITE_SIZE)
    }

    fn align_write_floor(size: usize) -> usize {
        align_floor(size, Self::WRITE_SIZE)
    }

    fn align_erase_ceil(size: usize) -> usize {
        align_ceil(size, Self::ERASE_SIZE)
    }
}

#[inline(always)]
pub(crate) const fn align_ceil(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size.saturating_add(alignment - 1) & !(alignment - 1)
    } else {
        size.saturating_add(alignment - 1) / alignment * alignment
    }
}

#[inline(always)]
pub(crate) const fn align_floor(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size & !(alignment - 1)
    } else {
        size / alignment * alignment
    }
}

impl<T: Platform> AlignedOps for T {}
