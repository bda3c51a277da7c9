//! Per-connection readiness flags shared between the USB stack and the
//! injection sequencer.
//!
//! Each flag has exactly one writer (the USB state handler for link/HID,
//! the mass-storage facet for storage) and one reader (the sequencer).
//! They are set at most once per connection and only cleared by
//! [`DeviceReadiness::reset`] on bus reset or disconnect.

use core::sync::atomic::{AtomicBool, Ordering};

/// Readiness of the composite device for the current connection.
#[derive(Debug, Default)]
pub struct DeviceReadiness {
    usb_link_up: AtomicBool,
    hid_interface_ready: AtomicBool,
    storage_interface_ready: AtomicBool,
}

/// Point-in-time copy of the three flags.
#[cfg(test)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadinessSnapshot {
    pub usb_link_up: bool,
    pub hid_interface_ready: bool,
    pub storage_interface_ready: bool,
}

// Single writer per flag, so a load-then-store is enough to report the
// first transition without needing compare-and-swap (thumbv6m has none).
fn set_once(flag: &AtomicBool) -> bool {
    if flag.load(Ordering::Acquire) {
        return false;
    }
    flag.store(true, Ordering::Release);
    true
}

impl DeviceReadiness {
    pub const fn new() -> Self {
        Self {
            usb_link_up: AtomicBool::new(false),
            hid_interface_ready: AtomicBool::new(false),
            storage_interface_ready: AtomicBool::new(false),
        }
    }

    /// Host addressed the device. Returns `true` on the first call only.
    pub fn mark_link_up(&self) -> bool {
        set_once(&self.usb_link_up)
    }

    /// Host configured the HID interface. Returns `true` on the first call only.
    pub fn mark_hid_ready(&self) -> bool {
        set_once(&self.hid_interface_ready)
    }

    /// Host issued its first capacity inquiry. Returns `true` on the first call only.
    pub fn mark_storage_ready(&self) -> bool {
        set_once(&self.storage_interface_ready)
    }

    pub fn link_up(&self) -> bool {
        self.usb_link_up.load(Ordering::Acquire)
    }

    pub fn hid_ready(&self) -> bool {
        self.hid_interface_ready.load(Ordering::Acquire)
    }

    pub fn storage_ready(&self) -> bool {
        self.storage_interface_ready.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> ReadinessSnapshot {
        ReadinessSnapshot {
            usb_link_up: self.link_up(),
            hid_interface_ready: self.hid_ready(),
            storage_interface_ready: self.storage_ready(),
        }
    }

    /// Clear all flags; the next connection starts from scratch.
    pub fn reset(&self) {
        self.usb_link_up.store(false, Ordering::Release);
        self.hid_interface_ready.store(false, Ordering::Release);
        self.storage_interface_ready.store(false, Ordering::Release);
    }
}
