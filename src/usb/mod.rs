//! USB Device subsystem - presents a composite device to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`.  We create a **composite device** with two interfaces:
//!
//! - Interface 0: Keyboard     (HID, boot protocol, interrupt IN)
//! - Interface 1: Mass storage (SCSI transparent, bulk-only transport)
//!
//! Bus events (addressed, configured, reset) feed the shared
//! `DeviceReadiness`; the mass-storage task marks storage ready on the
//! host's first capacity inquiry.

pub mod composite;
pub mod msc_class;
