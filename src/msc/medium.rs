//! Block medium behind the mass-storage facet.
//!
//! The medium is a seam: an SD card or a flash region would implement
//! [`BlockMedium`] in place of [`NullMedium`]. Operations cannot fail by
//! signature because host filesystem drivers retry aggressively on any
//! reported medium error.

use crate::config::{BLOCK_COUNT, BLOCK_SIZE};

/// Geometry reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capacity {
    pub block_size: u32,
    pub block_count: u32,
}

impl Capacity {
    /// Address of the last addressable block, as READ CAPACITY reports it.
    pub fn last_lba(&self) -> u32 {
        self.block_count.saturating_sub(1)
    }

    #[cfg(test)]
    pub fn total_bytes(&self) -> u64 {
        u64::from(self.block_size) * u64::from(self.block_count)
    }
}

pub trait BlockMedium {
    fn capacity(&self) -> Capacity;

    /// Fill `buf` with data starting `offset` bytes into block `lba`.
    /// Returns the number of bytes produced.
    fn read(&mut self, lba: u32, offset: u32, buf: &mut [u8]) -> usize;

    /// Store `data` starting `offset` bytes into block `lba`.
    /// Returns the number of bytes accepted.
    fn write(&mut self, lba: u32, offset: u32, data: &[u8]) -> usize;

    fn is_writable(&self) -> bool {
        true
    }
}

/// Stand-in medium: reads return zeros, writes are accepted and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NullMedium {
    capacity: Capacity,
}

impl NullMedium {
    pub const fn new(block_count: u32) -> Self {
        Self {
            capacity: Capacity {
                block_size: BLOCK_SIZE,
                block_count,
            },
        }
    }
}

impl Default for NullMedium {
    fn default() -> Self {
        Self::new(BLOCK_COUNT)
    }
}

impl BlockMedium for NullMedium {
    fn capacity(&self) -> Capacity {
        self.capacity
    }

    fn read(&mut self, _lba: u32, _offset: u32, buf: &mut [u8]) -> usize {
        buf.fill(0);
        buf.len()
    }

    fn write(&mut self, _lba: u32, _offset: u32, data: &[u8]) -> usize {
        data.len()
    }
}
