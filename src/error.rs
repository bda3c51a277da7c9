//! Unified error type for keyinject.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Sequencer
    /// The HID interface never became ready within the configured bound.
    HidReadyTimeout {
        /// Milliseconds spent polling before giving up.
        waited_ms: u32,
    },

    // Report emitter
    /// A report was emitted while the transport was not accepting reports.
    TransportNotReady,

    /// An active report was emitted before the previous one was released.
    ReleaseMissing,

    // USB
    /// The endpoint rejected the transfer (disabled or disconnected).
    Usb,

    // Mass storage
    /// A bulk-only Command Block Wrapper failed validation.
    InvalidCommandBlock,

    // Generic
    /// The injection script has no room for another phase.
    ScriptFull,
}

#[cfg(feature = "embedded")]
impl From<embassy_usb::driver::EndpointError> for Error {
    fn from(_: embassy_usb::driver::EndpointError) -> Self {
        Error::Usb
    }
}
