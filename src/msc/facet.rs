//! Mass-storage facet: answers the host's SCSI commands from a [`BlockMedium`].
//!
//! The first capacity inquiry doubles as the storage-ready signal for the
//! sequencer. Hosts always issue one while mounting the volume, so no
//! separate enumeration-complete callback is needed.

use super::bot::{CommandStatus, DataDirection};
use super::medium::{BlockMedium, Capacity};
use super::scsi::{self, ScsiCommand, Sense};
use crate::config::{SCSI_PRODUCT, SCSI_REVISION, SCSI_VENDOR};
use crate::readiness::DeviceReadiness;

/// Data stage the transport has to run for a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataStage {
    /// No data; go straight to the status wrapper.
    None,
    /// The first `n` bytes of the scratch buffer go to the host.
    In(usize),
    /// Stream `blocks` blocks starting at `lba` to the host.
    ReadBlocks { lba: u32, blocks: u16 },
    /// Receive `blocks` blocks starting at `lba` from the host.
    WriteBlocks { lba: u32, blocks: u16 },
}

impl DataStage {
    /// Direction the stage moves data in, if it moves any.
    pub fn direction(&self) -> Option<DataDirection> {
        match *self {
            DataStage::None => None,
            DataStage::In(_) | DataStage::ReadBlocks { .. } => Some(DataDirection::In),
            DataStage::WriteBlocks { .. } => Some(DataDirection::Out),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reply {
    pub status: CommandStatus,
    pub stage: DataStage,
}

impl Reply {
    fn passed(stage: DataStage) -> Self {
        Self {
            status: CommandStatus::Passed,
            stage,
        }
    }

    fn failed() -> Self {
        Self {
            status: CommandStatus::Failed,
            stage: DataStage::None,
        }
    }
}

pub struct MassStorage<'a, M> {
    medium: M,
    readiness: &'a DeviceReadiness,
    sense: Sense,
}

impl<'a, M: BlockMedium> MassStorage<'a, M> {
    pub fn new(medium: M, readiness: &'a DeviceReadiness) -> Self {
        Self {
            medium,
            readiness,
            sense: Sense::NO_SENSE,
        }
    }

    /// Capacity inquiry. Marks the storage interface ready on first use.
    pub fn capacity(&mut self) -> Capacity {
        let capacity = self.medium.capacity();
        if self.readiness.mark_storage_ready() {
            info!(
                "MSC capacity: blocks={=u32}, size={=u32} - storage ready",
                capacity.block_count,
                capacity.block_size
            );
        }
        capacity
    }

    /// Block read. Always succeeds.
    pub fn read(&mut self, lba: u32, offset: u32, buf: &mut [u8]) -> usize {
        trace!("MSC read: lba={=u32}, offset={=u32}, size={=usize}", lba, offset, buf.len());
        self.medium.read(lba, offset, buf)
    }

    /// Block write. Always succeeds.
    pub fn write(&mut self, lba: u32, offset: u32, data: &[u8]) -> usize {
        trace!("MSC write: lba={=u32}, offset={=u32}, size={=usize}", lba, offset, data.len());
        self.medium.write(lba, offset, data)
    }

    pub fn is_writable(&self) -> bool {
        self.medium.is_writable()
    }

    pub fn block_size(&self) -> u32 {
        self.medium.capacity().block_size
    }

    /// Highest logical unit number. There is exactly one LUN.
    pub fn max_lun(&self) -> u8 {
        0
    }

    /// Bulk-Only Mass Storage Reset.
    pub fn reset(&mut self) {
        self.sense = Sense::NO_SENSE;
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Execute `cmd`, staging any short response in `buf`.
    ///
    /// `buf` must hold at least [`scsi::INQUIRY_LEN`] bytes.
    pub fn handle(&mut self, cmd: &ScsiCommand, buf: &mut [u8]) -> Reply {
        let reply = match *cmd {
            ScsiCommand::TestUnitReady
            | ScsiCommand::StartStopUnit
            | ScsiCommand::PreventAllowMediumRemoval
            | ScsiCommand::Verify10
            | ScsiCommand::SynchronizeCache10 => Reply::passed(DataStage::None),
            ScsiCommand::Inquiry { alloc_len } => {
                let data = scsi::inquiry_data(SCSI_VENDOR, SCSI_PRODUCT, SCSI_REVISION);
                Reply::passed(DataStage::In(stage(buf, &data, alloc_len)))
            }
            ScsiCommand::RequestSense { alloc_len } => {
                let data = self.sense.to_bytes();
                self.sense = Sense::NO_SENSE;
                // Reporting the sense must not overwrite it below.
                return Reply::passed(DataStage::In(stage(buf, &data, alloc_len)));
            }
            ScsiCommand::ModeSense6 { alloc_len } => {
                let data = scsi::mode_sense_6_data(self.is_writable());
                Reply::passed(DataStage::In(stage(buf, &data, alloc_len)))
            }
            ScsiCommand::ModeSense10 { alloc_len } => {
                let data = scsi::mode_sense_10_data(self.is_writable());
                Reply::passed(DataStage::In(stage(buf, &data, alloc_len)))
            }
            ScsiCommand::ReadFormatCapacities { alloc_len } => {
                let cap = self.medium.capacity();
                let data = scsi::read_format_capacities_data(cap.block_count, cap.block_size);
                Reply::passed(DataStage::In(stage(buf, &data, alloc_len)))
            }
            ScsiCommand::ReadCapacity10 => {
                let cap = self.capacity();
                let data = scsi::read_capacity_data(cap.last_lba(), cap.block_size);
                Reply::passed(DataStage::In(stage(buf, &data, u16::MAX)))
            }
            ScsiCommand::Read10 { blocks: 0, .. } | ScsiCommand::Write10 { blocks: 0, .. } => {
                Reply::passed(DataStage::None)
            }
            ScsiCommand::Read10 { lba, blocks } => {
                Reply::passed(DataStage::ReadBlocks { lba, blocks })
            }
            ScsiCommand::Write10 { lba, blocks } => {
                Reply::passed(DataStage::WriteBlocks { lba, blocks })
            }
            ScsiCommand::Unsupported(op) => {
                warn!("MSC: unsupported SCSI opcode {=u8:#x}", op);
                self.sense = Sense::INVALID_COMMAND;
                return Reply::failed();
            }
        };
        self.sense = Sense::NO_SENSE;
        reply
    }
}

fn stage(buf: &mut [u8], data: &[u8], alloc_len: u16) -> usize {
    let n = data.len().min(alloc_len as usize).min(buf.len());
    buf[..n].copy_from_slice(&data[..n]);
    n
}
