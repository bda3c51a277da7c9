//! Bulk-Only Transport wrappers (USB MSC BBB).
//!
//! ```text
//! CBW (31 bytes, host → device)
//!   0..4   dCBWSignature          "USBC" (0x43425355 LE)
//!   4..8   dCBWTag                echoed in the CSW
//!   8..12  dCBWDataTransferLength bytes the host expects to move
//!   12     bmCBWFlags             bit 7 = data-in
//!   13     bCBWLUN                low nibble
//!   14     bCBWCBLength           1..=16
//!   15..31 CBWCB                  SCSI command block
//!
//! CSW (13 bytes, device → host)
//!   0..4   dCSWSignature          "USBS" (0x53425355 LE)
//!   4..8   dCSWTag
//!   8..12  dCSWDataResidue
//!   12     bCSWStatus
//! ```

use crate::error::Error;

pub const CBW_LEN: usize = 31;
pub const CSW_LEN: usize = 13;

const CBW_SIGNATURE: u32 = 0x4342_5355;
const CSW_SIGNATURE: u32 = 0x5342_5355;
const CBW_FLAG_DATA_IN: u8 = 0x80;

/// Class-specific control request: Get Max LUN.
pub const REQ_GET_MAX_LUN: u8 = 0xFE;
/// Class-specific control request: Bulk-Only Mass Storage Reset.
pub const REQ_BULK_ONLY_RESET: u8 = 0xFF;

/// Direction of the data stage, seen from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataDirection {
    /// Device → host.
    In,
    /// Host → device.
    Out,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandBlockWrapper {
    pub tag: u32,
    pub data_transfer_length: u32,
    pub direction: DataDirection,
    pub lun: u8,
    cb: [u8; 16],
    cb_len: u8,
}

impl CommandBlockWrapper {
    /// Parse and validate a CBW.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != CBW_LEN {
            return Err(Error::InvalidCommandBlock);
        }
        if read_u32_le(&bytes[0..4]) != CBW_SIGNATURE {
            return Err(Error::InvalidCommandBlock);
        }
        let cb_len = bytes[14] & 0x1F;
        if cb_len == 0 || cb_len > 16 {
            return Err(Error::InvalidCommandBlock);
        }

        let mut cb = [0u8; 16];
        cb.copy_from_slice(&bytes[15..31]);
        Ok(Self {
            tag: read_u32_le(&bytes[4..8]),
            data_transfer_length: read_u32_le(&bytes[8..12]),
            direction: if bytes[12] & CBW_FLAG_DATA_IN != 0 {
                DataDirection::In
            } else {
                DataDirection::Out
            },
            lun: bytes[13] & 0x0F,
            cb,
            cb_len,
        })
    }

    /// The SCSI command block (`cb_len` bytes).
    pub fn command_block(&self) -> &[u8] {
        &self.cb[..self.cb_len as usize]
    }

    /// Whether the host's declared data phase can carry a stage moving data
    /// in `needed`. A stage with no data fits anything; the host's bytes are
    /// skipped.
    pub fn admits(&self, needed: Option<DataDirection>) -> bool {
        match needed {
            None => true,
            Some(dir) => self.data_transfer_length > 0 && self.direction == dir,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandStatus {
    Passed = 0x00,
    Failed = 0x01,
    PhaseError = 0x02,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandStatusWrapper {
    pub tag: u32,
    pub residue: u32,
    pub status: CommandStatus,
}

impl CommandStatusWrapper {
    pub fn new(tag: u32, residue: u32, status: CommandStatus) -> Self {
        Self {
            tag,
            residue,
            status,
        }
    }

    pub fn to_bytes(&self) -> [u8; CSW_LEN] {
        let mut buf = [0u8; CSW_LEN];
        buf[0..4].copy_from_slice(&CSW_SIGNATURE.to_le_bytes());
        buf[4..8].copy_from_slice(&self.tag.to_le_bytes());
        buf[8..12].copy_from_slice(&self.residue.to_le_bytes());
        buf[12] = self.status as u8;
        buf
    }
}

/// How many of `available` bytes to send when the host asked for `expected`,
/// and the residue to report.
pub fn clamp_data_in(available: usize, expected: u32) -> (usize, u32) {
    let send = available.min(expected as usize);
    (send, expected - send as u32)
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
