//! Mass-storage facet of the composite device.
//!
//! - [`bot`]: Bulk-Only Transport command/status wrappers
//! - [`scsi`]: command decoding and response payloads
//! - [`facet`]: command execution against a [`medium::BlockMedium`]
//! - [`medium`]: the block medium seam and the zero-filled stand-in

pub mod bot;
pub mod facet;
pub mod medium;
pub mod scsi;

#[cfg(test)]
mod tests;

pub use facet::{DataStage, MassStorage, Reply};
pub use medium::{BlockMedium, Capacity, NullMedium};

/// USB Mass Storage class code.
pub const CLASS_MASS_STORAGE: u8 = 0x08;
/// SCSI transparent command set subclass.
pub const SUBCLASS_SCSI: u8 = 0x06;
/// Bulk-only transport protocol.
pub const PROTOCOL_BULK_ONLY: u8 = 0x50;
