//! Composite USB keyboard + mass-storage device that types a scripted
//! command once the host has enumerated it.
//!
//! The pure logic (key mapping, report pairing, the injection sequencer and
//! SCSI handling) builds and tests on the host with no features enabled:
//!
//! Usage: `cargo test`
//!
//! The `embedded` feature adds the embassy-usb glue in [`usb`] that the
//! nRF52840 binary in `main.rs` wires together.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible in every module below.
#[macro_use]
mod fmt;

pub mod config;
pub mod emitter;
pub mod error;
pub mod hid;
pub mod keymap;
pub mod msc;
pub mod readiness;
pub mod script;
pub mod sequencer;

#[cfg(feature = "embedded")]
pub mod usb;

pub use config::{InjectionConfig, Timing};
pub use error::Error;
pub use readiness::DeviceReadiness;
pub use sequencer::{RunSummary, Sequencer, State};
