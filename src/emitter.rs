//! Keyboard report emitter.
//!
//! Wraps a [`ReportSink`] (the HID interrupt-IN endpoint on target, a
//! recorder in tests) and enforces the press/release pairing the host's
//! keyboard driver relies on: after an active report the next report must
//! be the all-zero release report, otherwise the host sees a stuck key.

use crate::error::Error;
use crate::hid::KeyboardReport;

/// Transport for 8-byte keyboard reports.
#[allow(async_fn_in_trait)]
pub trait ReportSink {
    /// Whether the transport currently accepts reports.
    fn ready(&self) -> bool;

    /// Transmit one report. Resolves once the endpoint has taken it.
    async fn send(&mut self, report: &KeyboardReport) -> Result<(), Error>;
}

impl<T: ReportSink> ReportSink for &mut T {
    fn ready(&self) -> bool {
        T::ready(self)
    }

    async fn send(&mut self, report: &KeyboardReport) -> Result<(), Error> {
        T::send(self, report).await
    }
}

/// Emits reports one at a time while tracking whether a key is held.
pub struct ReportEmitter<S> {
    sink: S,
    key_down: bool,
    sent: u32,
}

impl<S: ReportSink> ReportEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            key_down: false,
            sent: 0,
        }
    }

    /// Transmit `report`.
    ///
    /// Callers must check readiness first; an active report while the
    /// previous active report is still held is refused.
    pub async fn emit(&mut self, report: KeyboardReport) -> Result<(), Error> {
        if !self.sink.ready() {
            return Err(Error::TransportNotReady);
        }
        let active = !report.is_released();
        if active && self.key_down {
            return Err(Error::ReleaseMissing);
        }

        self.sink.send(&report).await?;
        self.key_down = active;
        self.sent += 1;
        trace!("report sent: mod={=u8:#x} key0={=u8:#x}", report.modifier, report.keycodes[0]);
        Ok(())
    }

    /// Transmit the all-keys-released report.
    pub async fn release(&mut self) -> Result<(), Error> {
        self.emit(KeyboardReport::released()).await
    }

    pub fn ready(&self) -> bool {
        self.sink.ready()
    }

    /// `true` between an active report and its release.
    pub fn key_down(&self) -> bool {
        self.key_down
    }

    pub fn reports_sent(&self) -> u32 {
        self.sent
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    pub fn into_sink(self) -> S {
        self.sink
    }
}
