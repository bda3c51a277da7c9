//! SCSI transparent command set subset issued by host class drivers.

/// SCSI operation codes.
pub mod opcode {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const INQUIRY: u8 = 0x12;
    pub const MODE_SENSE_6: u8 = 0x1A;
    pub const START_STOP_UNIT: u8 = 0x1B;
    pub const PREVENT_ALLOW_MEDIUM_REMOVAL: u8 = 0x1E;
    pub const READ_FORMAT_CAPACITIES: u8 = 0x23;
    pub const READ_CAPACITY_10: u8 = 0x25;
    pub const READ_10: u8 = 0x28;
    pub const WRITE_10: u8 = 0x2A;
    pub const VERIFY_10: u8 = 0x2F;
    pub const SYNCHRONIZE_CACHE_10: u8 = 0x35;
    pub const MODE_SENSE_10: u8 = 0x5A;
}

pub const INQUIRY_LEN: usize = 36;
pub const REQUEST_SENSE_LEN: usize = 18;
pub const READ_CAPACITY_LEN: usize = 8;
pub const READ_FORMAT_CAPACITIES_LEN: usize = 12;
pub const MODE_SENSE_6_LEN: usize = 4;
pub const MODE_SENSE_10_LEN: usize = 8;

/// Decoded command block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScsiCommand {
    TestUnitReady,
    RequestSense { alloc_len: u16 },
    Inquiry { alloc_len: u16 },
    ModeSense6 { alloc_len: u16 },
    ModeSense10 { alloc_len: u16 },
    StartStopUnit,
    PreventAllowMediumRemoval,
    ReadFormatCapacities { alloc_len: u16 },
    ReadCapacity10,
    Read10 { lba: u32, blocks: u16 },
    Write10 { lba: u32, blocks: u16 },
    Verify10,
    SynchronizeCache10,
    /// Anything else, or a block too short for its opcode.
    Unsupported(u8),
}

impl ScsiCommand {
    pub fn parse(cb: &[u8]) -> Self {
        let Some(&op) = cb.first() else {
            return ScsiCommand::Unsupported(0xFF);
        };
        let need = match op {
            opcode::TEST_UNIT_READY
            | opcode::REQUEST_SENSE
            | opcode::INQUIRY
            | opcode::MODE_SENSE_6
            | opcode::START_STOP_UNIT
            | opcode::PREVENT_ALLOW_MEDIUM_REMOVAL => 6,
            opcode::READ_FORMAT_CAPACITIES
            | opcode::READ_CAPACITY_10
            | opcode::READ_10
            | opcode::WRITE_10
            | opcode::VERIFY_10
            | opcode::SYNCHRONIZE_CACHE_10
            | opcode::MODE_SENSE_10 => 10,
            _ => return ScsiCommand::Unsupported(op),
        };
        if cb.len() < need {
            return ScsiCommand::Unsupported(op);
        }

        match op {
            opcode::TEST_UNIT_READY => ScsiCommand::TestUnitReady,
            opcode::REQUEST_SENSE => ScsiCommand::RequestSense {
                alloc_len: u16::from(cb[4]),
            },
            opcode::INQUIRY => ScsiCommand::Inquiry {
                alloc_len: be_u16(&cb[3..5]),
            },
            opcode::MODE_SENSE_6 => ScsiCommand::ModeSense6 {
                alloc_len: u16::from(cb[4]),
            },
            opcode::START_STOP_UNIT => ScsiCommand::StartStopUnit,
            opcode::PREVENT_ALLOW_MEDIUM_REMOVAL => ScsiCommand::PreventAllowMediumRemoval,
            opcode::READ_FORMAT_CAPACITIES => ScsiCommand::ReadFormatCapacities {
                alloc_len: be_u16(&cb[7..9]),
            },
            opcode::READ_CAPACITY_10 => ScsiCommand::ReadCapacity10,
            opcode::READ_10 => ScsiCommand::Read10 {
                lba: be_u32(&cb[2..6]),
                blocks: be_u16(&cb[7..9]),
            },
            opcode::WRITE_10 => ScsiCommand::Write10 {
                lba: be_u32(&cb[2..6]),
                blocks: be_u16(&cb[7..9]),
            },
            opcode::VERIFY_10 => ScsiCommand::Verify10,
            opcode::SYNCHRONIZE_CACHE_10 => ScsiCommand::SynchronizeCache10,
            opcode::MODE_SENSE_10 => ScsiCommand::ModeSense10 {
                alloc_len: be_u16(&cb[7..9]),
            },
            _ => ScsiCommand::Unsupported(op),
        }
    }
}

/// Sense key / additional sense code pair kept for the next REQUEST SENSE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sense {
    pub key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl Sense {
    pub const NO_SENSE: Self = Self {
        key: 0x00,
        asc: 0x00,
        ascq: 0x00,
    };
    pub const INVALID_COMMAND: Self = Self {
        key: 0x05, // ILLEGAL REQUEST
        asc: 0x20, // INVALID COMMAND OPERATION CODE
        ascq: 0x00,
    };

    /// Fixed-format sense data.
    pub fn to_bytes(&self) -> [u8; REQUEST_SENSE_LEN] {
        let mut buf = [0u8; REQUEST_SENSE_LEN];
        buf[0] = 0x70; // current error, fixed format
        buf[2] = self.key & 0x0F;
        buf[7] = (REQUEST_SENSE_LEN - 8) as u8;
        buf[12] = self.asc;
        buf[13] = self.ascq;
        buf
    }
}

/// Standard INQUIRY data for a removable direct-access device.
pub fn inquiry_data(vendor: &str, product: &str, revision: &str) -> [u8; INQUIRY_LEN] {
    let mut buf = [0u8; INQUIRY_LEN];
    buf[0] = 0x00; // direct-access block device
    buf[1] = 0x80; // removable medium
    buf[2] = 0x04; // SPC-2
    buf[3] = 0x02; // response data format
    buf[4] = (INQUIRY_LEN - 5) as u8;
    pad_ascii(&mut buf[8..16], vendor);
    pad_ascii(&mut buf[16..32], product);
    pad_ascii(&mut buf[32..36], revision);
    buf
}

pub fn read_capacity_data(last_lba: u32, block_size: u32) -> [u8; READ_CAPACITY_LEN] {
    let mut buf = [0u8; READ_CAPACITY_LEN];
    buf[0..4].copy_from_slice(&last_lba.to_be_bytes());
    buf[4..8].copy_from_slice(&block_size.to_be_bytes());
    buf
}

pub fn read_format_capacities_data(
    block_count: u32,
    block_size: u32,
) -> [u8; READ_FORMAT_CAPACITIES_LEN] {
    let mut buf = [0u8; READ_FORMAT_CAPACITIES_LEN];
    buf[3] = 8; // capacity list length
    buf[4..8].copy_from_slice(&block_count.to_be_bytes());
    buf[8] = 0x02; // formatted media
    buf[9..12].copy_from_slice(&block_size.to_be_bytes()[1..4]);
    buf
}

pub fn mode_sense_6_data(writable: bool) -> [u8; MODE_SENSE_6_LEN] {
    [
        (MODE_SENSE_6_LEN - 1) as u8,
        0x00,
        if writable { 0x00 } else { 0x80 },
        0x00,
    ]
}

pub fn mode_sense_10_data(writable: bool) -> [u8; MODE_SENSE_10_LEN] {
    let mut buf = [0u8; MODE_SENSE_10_LEN];
    buf[1] = (MODE_SENSE_10_LEN - 2) as u8;
    buf[3] = if writable { 0x00 } else { 0x80 };
    buf
}

fn pad_ascii(dst: &mut [u8], src: &str) {
    dst.fill(b' ');
    for (d, s) in dst.iter_mut().zip(src.bytes()) {
        *d = s;
    }
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
