//! Unit tests for the mass-storage facet, SCSI decoding and BOT wrappers.

use super::bot::{
    clamp_data_in, CommandBlockWrapper, CommandStatus, CommandStatusWrapper, DataDirection,
    CBW_LEN,
};
use super::facet::{DataStage, MassStorage};
use super::medium::{BlockMedium, Capacity, NullMedium};
use super::scsi::{self, opcode, ScsiCommand, Sense};
use crate::config::{BLOCK_COUNT, BLOCK_SIZE};
use crate::error::Error;
use crate::readiness::DeviceReadiness;

fn cbw(tag: u32, len: u32, data_in: bool, cb: &[u8]) -> [u8; CBW_LEN] {
    let mut buf = [0u8; CBW_LEN];
    buf[0..4].copy_from_slice(b"USBC");
    buf[4..8].copy_from_slice(&tag.to_le_bytes());
    buf[8..12].copy_from_slice(&len.to_le_bytes());
    buf[12] = if data_in { 0x80 } else { 0x00 };
    buf[14] = cb.len() as u8;
    buf[15..15 + cb.len()].copy_from_slice(cb);
    buf
}

// ═══════════════════════════════════════════════════════════════════════════
// Facet contract
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn capacity_is_fixed_and_idempotent() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);

    let first = msc.capacity();
    assert_eq!(
        first,
        Capacity {
            block_size: 512,
            block_count: 1024 * 1024
        }
    );
    for _ in 0..5 {
        assert_eq!(msc.capacity(), first);
    }
    assert_eq!(first.total_bytes(), 512 * 1024 * 1024);
}

#[test]
fn capacity_sets_storage_ready_once() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    assert!(!readiness.storage_ready());

    msc.capacity();
    assert!(readiness.storage_ready());
    // Already set: further inquiries leave it alone.
    assert!(!readiness.mark_storage_ready());
    msc.capacity();
    assert!(readiness.storage_ready());
    assert!(!readiness.hid_ready());
}

#[test]
fn reads_are_zero_filled_at_any_address_and_size() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);

    let cases = [(0u32, 512usize), (7, 64), (BLOCK_COUNT - 1, 4096), (u32::MAX, 1), (3, 0)];
    for (lba, size) in cases {
        let mut buf = vec![0xA5u8; size];
        assert_eq!(msc.read(lba, 0, &mut buf), size);
        assert_eq!(buf.len(), size);
        assert!(buf.iter().all(|&b| b == 0), "lba {lba} size {size}");
    }
}

#[test]
fn writes_are_accepted_and_leave_medium_unchanged() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);

    let data = [0xFFu8; 512];
    assert_eq!(msc.write(10, 0, &data), 512);
    assert_eq!(msc.write(10, 256, &data[..256]), 256);

    let mut buf = [0x11u8; 512];
    msc.read(10, 0, &mut buf);
    assert_eq!(buf, [0u8; 512]);
}

#[test]
fn medium_is_writable() {
    let readiness = DeviceReadiness::new();
    let msc = MassStorage::new(NullMedium::default(), &readiness);
    assert!(msc.is_writable());
    assert_eq!(msc.block_size(), BLOCK_SIZE);
    assert_eq!(msc.max_lun(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// SCSI command handling
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn read_capacity_reports_last_lba_and_marks_ready() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    let mut buf = [0u8; 64];

    let reply = msc.handle(&ScsiCommand::ReadCapacity10, &mut buf);
    assert_eq!(reply.status, CommandStatus::Passed);
    assert_eq!(reply.stage, DataStage::In(8));
    assert_eq!(&buf[..8], &[0x00, 0x0F, 0xFF, 0xFF, 0x00, 0x00, 0x02, 0x00]);
    assert!(readiness.storage_ready());
}

#[test]
fn read_format_capacities_does_not_mark_ready() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::new(16), &readiness);
    let mut buf = [0u8; 64];

    let reply = msc.handle(&ScsiCommand::ReadFormatCapacities { alloc_len: 252 }, &mut buf);
    assert_eq!(reply.stage, DataStage::In(12));
    assert_eq!(&buf[..12], &[0, 0, 0, 8, 0, 0, 0, 16, 0x02, 0x00, 0x02, 0x00]);
    assert!(!readiness.storage_ready());
}

#[test]
fn inquiry_is_removable_and_truncated_to_allocation() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    let mut buf = [0u8; 64];

    let reply = msc.handle(&ScsiCommand::Inquiry { alloc_len: 36 }, &mut buf);
    assert_eq!(reply.stage, DataStage::In(scsi::INQUIRY_LEN));
    assert_eq!(buf[0], 0x00);
    assert_eq!(buf[1], 0x80);
    assert_eq!(&buf[8..16], b"keyinjct");
    assert_eq!(&buf[16..32], b"Removable Disk  ");

    let reply = msc.handle(&ScsiCommand::Inquiry { alloc_len: 5 }, &mut buf);
    assert_eq!(reply.stage, DataStage::In(5));
}

#[test]
fn mode_sense_reports_write_enabled() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    let mut buf = [0u8; 64];

    let reply = msc.handle(&ScsiCommand::ModeSense6 { alloc_len: 192 }, &mut buf);
    assert_eq!(reply.stage, DataStage::In(4));
    assert_eq!(&buf[..4], &[3, 0, 0, 0]);

    let reply = msc.handle(&ScsiCommand::ModeSense10 { alloc_len: 8 }, &mut buf);
    assert_eq!(reply.stage, DataStage::In(8));
    assert_eq!(buf[3], 0);
}

#[test]
fn read_and_write_become_block_stages() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    let mut buf = [0u8; 64];

    let reply = msc.handle(&ScsiCommand::Read10 { lba: 2048, blocks: 8 }, &mut buf);
    assert_eq!(reply.stage, DataStage::ReadBlocks { lba: 2048, blocks: 8 });
    let reply = msc.handle(&ScsiCommand::Write10 { lba: 1, blocks: 2 }, &mut buf);
    assert_eq!(reply.stage, DataStage::WriteBlocks { lba: 1, blocks: 2 });
    let reply = msc.handle(&ScsiCommand::Read10 { lba: 1, blocks: 0 }, &mut buf);
    assert_eq!(reply.stage, DataStage::None);
    assert_eq!(reply.status, CommandStatus::Passed);
}

#[test]
fn unsupported_opcode_fails_with_illegal_request_sense() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    let mut buf = [0u8; 64];

    let reply = msc.handle(&ScsiCommand::Unsupported(0xA0), &mut buf);
    assert_eq!(reply.status, CommandStatus::Failed);
    assert_eq!(reply.stage, DataStage::None);
    assert_eq!(msc.sense(), Sense::INVALID_COMMAND);

    let reply = msc.handle(&ScsiCommand::RequestSense { alloc_len: 18 }, &mut buf);
    assert_eq!(reply.stage, DataStage::In(18));
    assert_eq!(buf[0], 0x70);
    assert_eq!(buf[2], 0x05);
    assert_eq!(buf[12], 0x20);
    assert_eq!(msc.sense(), Sense::NO_SENSE);
}

#[test]
fn reset_clears_pending_sense() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    let mut buf = [0u8; 64];
    msc.handle(&ScsiCommand::Unsupported(0x55), &mut buf);
    msc.reset();
    assert_eq!(msc.sense(), Sense::NO_SENSE);
}

#[test]
fn parse_command_blocks() {
    assert_eq!(ScsiCommand::parse(&[0u8; 6]), ScsiCommand::TestUnitReady);
    assert_eq!(
        ScsiCommand::parse(&[opcode::INQUIRY, 0, 0, 0, 36, 0]),
        ScsiCommand::Inquiry { alloc_len: 36 }
    );
    assert_eq!(
        ScsiCommand::parse(&[opcode::READ_10, 0, 0x00, 0x01, 0x02, 0x03, 0, 0x00, 0x10, 0]),
        ScsiCommand::Read10 {
            lba: 0x0001_0203,
            blocks: 16
        }
    );
    assert_eq!(
        ScsiCommand::parse(&[opcode::WRITE_10, 0, 0, 0, 0, 9, 0, 0, 1, 0]),
        ScsiCommand::Write10 { lba: 9, blocks: 1 }
    );
    assert_eq!(
        ScsiCommand::parse(&[opcode::READ_CAPACITY_10, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        ScsiCommand::ReadCapacity10
    );
}

#[test]
fn parse_short_or_unknown_blocks_as_unsupported() {
    assert_eq!(ScsiCommand::parse(&[]), ScsiCommand::Unsupported(0xFF));
    assert_eq!(
        ScsiCommand::parse(&[opcode::READ_10, 0, 0]),
        ScsiCommand::Unsupported(opcode::READ_10)
    );
    assert_eq!(ScsiCommand::parse(&[0xA0; 12]), ScsiCommand::Unsupported(0xA0));
}

// ═══════════════════════════════════════════════════════════════════════════
// Bulk-only wrappers
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn cbw_parse_valid() {
    let raw = cbw(0xDEAD_BEEF, 512, true, &[opcode::READ_10, 0, 0, 0, 0, 0, 0, 0, 1, 0]);
    let parsed = CommandBlockWrapper::parse(&raw).unwrap();
    assert_eq!(parsed.tag, 0xDEAD_BEEF);
    assert_eq!(parsed.data_transfer_length, 512);
    assert_eq!(parsed.direction, DataDirection::In);
    assert_eq!(parsed.lun, 0);
    assert_eq!(parsed.command_block().len(), 10);
    assert_eq!(
        ScsiCommand::parse(parsed.command_block()),
        ScsiCommand::Read10 { lba: 0, blocks: 1 }
    );
}

#[test]
fn cbw_parse_rejects_bad_signature_length_and_cb_len() {
    let mut raw = cbw(1, 0, false, &[0; 6]);
    raw[0] = b'X';
    assert_eq!(CommandBlockWrapper::parse(&raw), Err(Error::InvalidCommandBlock));

    let raw = cbw(1, 0, false, &[0; 6]);
    assert_eq!(
        CommandBlockWrapper::parse(&raw[..30]),
        Err(Error::InvalidCommandBlock)
    );

    let mut raw = cbw(1, 0, false, &[0; 6]);
    raw[14] = 0;
    assert_eq!(CommandBlockWrapper::parse(&raw), Err(Error::InvalidCommandBlock));
    raw[14] = 17;
    assert_eq!(CommandBlockWrapper::parse(&raw), Err(Error::InvalidCommandBlock));
}

#[test]
fn cbw_admits_only_matching_data_phase() {
    let read = [opcode::READ_10, 0, 0, 0, 0, 0, 0, 0, 1, 0];
    let data_in = CommandBlockWrapper::parse(&cbw(1, 512, true, &read)).unwrap();
    let data_out = CommandBlockWrapper::parse(&cbw(2, 512, false, &read)).unwrap();
    let no_data = CommandBlockWrapper::parse(&cbw(3, 0, true, &read)).unwrap();

    assert!(data_in.admits(Some(DataDirection::In)));
    assert!(!data_in.admits(Some(DataDirection::Out)));
    assert!(!data_out.admits(Some(DataDirection::In)));
    assert!(data_out.admits(Some(DataDirection::Out)));
    // Device has data but the host expects none.
    assert!(!no_data.admits(Some(DataDirection::In)));
    // No device data fits any host expectation.
    assert!(data_in.admits(None));
    assert!(data_out.admits(None));
    assert!(no_data.admits(None));
}

#[test]
fn read_sent_as_host_to_device_is_a_phase_mismatch() {
    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(NullMedium::default(), &readiness);
    let mut buf = [0u8; 64];
    let raw = cbw(9, 512, false, &[opcode::READ_10, 0, 0, 0, 0, 4, 0, 0, 1, 0]);
    let wrapper = CommandBlockWrapper::parse(&raw).unwrap();

    let reply = msc.handle(&ScsiCommand::parse(wrapper.command_block()), &mut buf);
    assert_eq!(reply.stage, DataStage::ReadBlocks { lba: 4, blocks: 1 });
    assert_eq!(reply.stage.direction(), Some(DataDirection::In));
    assert!(!wrapper.admits(reply.stage.direction()));

    let write = DataStage::WriteBlocks { lba: 0, blocks: 1 };
    assert_eq!(write.direction(), Some(DataDirection::Out));
    assert_eq!(DataStage::None.direction(), None);

    let csw = CommandStatusWrapper::new(wrapper.tag, 512, CommandStatus::PhaseError);
    assert_eq!(csw.to_bytes()[12], 0x02);
}

#[test]
fn csw_layout() {
    let csw = CommandStatusWrapper::new(0x0102_0304, 12, CommandStatus::Failed);
    assert_eq!(
        csw.to_bytes(),
        [b'U', b'S', b'B', b'S', 0x04, 0x03, 0x02, 0x01, 12, 0, 0, 0, 0x01]
    );
}

#[test]
fn data_in_is_clamped_to_host_expectation() {
    assert_eq!(clamp_data_in(36, 36), (36, 0));
    assert_eq!(clamp_data_in(36, 255), (36, 219));
    assert_eq!(clamp_data_in(18, 8), (8, 0));
    assert_eq!(clamp_data_in(8, 0), (0, 0));
}

#[test]
fn custom_medium_plugs_into_facet() {
    struct ReadOnly;
    impl BlockMedium for ReadOnly {
        fn capacity(&self) -> Capacity {
            Capacity {
                block_size: 512,
                block_count: 8,
            }
        }
        fn read(&mut self, _lba: u32, _offset: u32, buf: &mut [u8]) -> usize {
            buf.fill(0xEE);
            buf.len()
        }
        fn write(&mut self, _lba: u32, _offset: u32, _data: &[u8]) -> usize {
            0
        }
        fn is_writable(&self) -> bool {
            false
        }
    }

    let readiness = DeviceReadiness::new();
    let mut msc = MassStorage::new(ReadOnly, &readiness);
    let mut buf = [0u8; 64];
    msc.handle(&ScsiCommand::ModeSense6 { alloc_len: 4 }, &mut buf);
    assert_eq!(buf[2], 0x80);
    assert_eq!(msc.capacity().last_lba(), 7);
}
