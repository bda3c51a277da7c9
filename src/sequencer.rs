//! Keystroke injection sequencer.
//!
//! State machine:
//!
//! ```text
//! AwaitHidReady ──► AwaitStorageReady ──► Settling ──► Typing ──► Idle
//!       │                                                  │
//!       └──(timeout)──► Failed ◄──(transport lost)─────────┘
//! ```
//!
//! Every wait is a short `DelayNs` sleep, so on target the USB tasks keep
//! servicing the host (capacity/read/write requests, HID polls) while the
//! sequencer stalls. There is no re-entry and no cancellation: once started
//! the script runs to completion, and the terminal states stay terminal.

use crate::config::{InjectionConfig, Timing};
use crate::emitter::{ReportEmitter, ReportSink};
use crate::error::Error;
use crate::hid::KeyboardReport;
use crate::keymap::{self, KeyEvent, Modifiers};
use crate::readiness::DeviceReadiness;
use crate::script::Phase;
use embedded_hal_async::delay::DelayNs;

/// Sequencer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    AwaitHidReady,
    AwaitStorageReady,
    Settling,
    Typing,
    /// Script finished. Terminal.
    Idle,
    /// The HID interface never came up, or stopped accepting reports
    /// mid-script. Terminal.
    Failed,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Idle | State::Failed)
    }
}

/// Release attempts before a held key is given up on.
const RELEASE_ATTEMPTS: u32 = 2;

/// What a completed run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunSummary {
    /// `true` if the host issued a capacity inquiry before the storage
    /// wait ran out; `false` if typing started on exhaustion.
    pub storage_confirmed: bool,
    /// Reports put on the wire, release reports included.
    pub reports_sent: u32,
    /// Characters of literal phases dropped as unmappable.
    pub skipped_chars: u32,
}

pub struct Sequencer<'a, S, D> {
    state: State,
    config: InjectionConfig<'a>,
    readiness: &'a DeviceReadiness,
    emitter: ReportEmitter<S>,
    delay: D,
    summary: RunSummary,
    failure: Option<Error>,
}

impl<'a, S: ReportSink, D: DelayNs> Sequencer<'a, S, D> {
    pub fn new(
        config: InjectionConfig<'a>,
        readiness: &'a DeviceReadiness,
        sink: S,
        delay: D,
    ) -> Self {
        Self {
            state: State::AwaitHidReady,
            config,
            readiness,
            emitter: ReportEmitter::new(sink),
            delay,
            summary: RunSummary::default(),
            failure: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            reports_sent: self.emitter.reports_sent(),
            ..self.summary
        }
    }

    pub fn sink(&self) -> &S {
        self.emitter.sink()
    }

    /// Drive the state machine until it reaches a terminal state.
    pub async fn run(&mut self) -> Result<RunSummary, Error> {
        info!("sequencer: starting with {=usize} phases", self.config.script.len());
        while !self.state.is_terminal() {
            self.step().await?;
        }
        match self.state {
            State::Idle => Ok(self.summary()),
            _ => Err(self.failure()),
        }
    }

    /// Perform the work of the current state and move to the next one.
    ///
    /// Calling `step` in a terminal state does nothing (`Idle`) or repeats
    /// the failure (`Failed`).
    pub async fn step(&mut self) -> Result<State, Error> {
        let next = match self.state {
            State::AwaitHidReady => self.await_hid_ready().await?,
            State::AwaitStorageReady => self.await_storage_ready().await,
            State::Settling => {
                info!("sequencer: settling for {=u32} ms", self.timing().settle_ms);
                self.delay.delay_ms(self.timing().settle_ms).await;
                State::Typing
            }
            State::Typing => {
                self.type_script().await?;
                let summary = self.summary();
                info!(
                    "sequencer: done, {=u32} reports, {=u32} chars skipped",
                    summary.reports_sent,
                    summary.skipped_chars
                );
                State::Idle
            }
            State::Idle => State::Idle,
            State::Failed => return Err(self.failure()),
        };
        self.state = next;
        Ok(next)
    }

    fn timing(&self) -> Timing {
        self.config.timing
    }

    /// Poll interval for HID and transport waits. Never zero, so a bounded
    /// wait always runs out.
    fn poll_ms(&self) -> u32 {
        self.timing().hid_poll_ms.max(1)
    }

    fn failure(&self) -> Error {
        self.failure.unwrap_or(Error::HidReadyTimeout {
            waited_ms: self.timing().hid_timeout_ms.unwrap_or(0),
        })
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = State::Failed;
        self.failure = Some(err);
        err
    }

    async fn await_hid_ready(&mut self) -> Result<State, Error> {
        let limit = self.timing().hid_timeout_ms;
        let poll_ms = self.poll_ms();
        let mut waited_ms: u32 = 0;
        loop {
            if self.readiness.hid_ready() {
                info!("sequencer: HID ready after {=u32} ms", waited_ms);
                return Ok(State::AwaitStorageReady);
            }
            if limit.is_some_and(|limit| waited_ms >= limit) {
                error!("sequencer: HID not ready after {=u32} ms, giving up", waited_ms);
                return Err(self.fail(Error::HidReadyTimeout { waited_ms }));
            }
            self.delay.delay_ms(poll_ms).await;
            waited_ms = waited_ms.saturating_add(poll_ms);
        }
    }

    async fn await_storage_ready(&mut self) -> State {
        let timing = self.timing();
        for _ in 0..timing.storage_attempts {
            if self.readiness.storage_ready() {
                break;
            }
            self.delay.delay_ms(timing.storage_poll_ms).await;
        }

        self.summary.storage_confirmed = self.readiness.storage_ready();
        if self.summary.storage_confirmed {
            info!("sequencer: storage ready");
        } else {
            warn!(
                "sequencer: no capacity inquiry after {=u32} polls, continuing",
                timing.storage_attempts
            );
        }
        State::Settling
    }

    async fn type_script(&mut self) -> Result<(), Error> {
        let script = self.config.script.clone();
        for (i, phase) in script.phases().iter().enumerate() {
            if i > 0 {
                self.delay.delay_ms(self.timing().phase_gap_ms).await;
            }
            match *phase {
                Phase::ChordPress { modifiers, key } => {
                    debug!("sequencer: chord {=u8:#x}+{}", modifiers.bits(), key);
                    let hold = self.timing().chord_hold_ms;
                    self.tap(KeyEvent::new(key, modifiers), hold).await?;
                }
                Phase::LiteralString(text) => {
                    debug!("sequencer: typing {=usize} chars", text.len());
                    self.type_literal(text).await?;
                }
                Phase::KeyPress(key) => {
                    debug!("sequencer: key {}", key);
                    let hold = self.timing().key_hold_ms;
                    self.tap(KeyEvent::new(key, Modifiers::NONE), hold).await?;
                }
            }
        }
        Ok(())
    }

    async fn type_literal(&mut self, text: &str) -> Result<(), Error> {
        let hold = self.timing().key_hold_ms;
        let mut first = true;
        for ch in text.chars() {
            match keymap::map(ch) {
                Ok(event) => {
                    if !first {
                        self.delay.delay_ms(self.timing().key_gap_ms).await;
                    }
                    first = false;
                    self.tap(event, hold).await?;
                }
                Err(_unmappable) => {
                    debug!("sequencer: skipping unmappable char {}", _unmappable);
                    self.summary.skipped_chars += 1;
                }
            }
        }
        Ok(())
    }

    /// Active report, hold, release report.
    ///
    /// A press that cannot be sent, or a release that still cannot be sent
    /// after [`RELEASE_ATTEMPTS`] bounded waits, ends the session in
    /// `Failed`.
    async fn tap(&mut self, event: KeyEvent, hold_ms: u32) -> Result<(), Error> {
        if let Err(e) = self.send_when_ready(KeyboardReport::from_event(event)).await {
            error!("sequencer: press not sent: {}", e);
            return Err(self.fail(e));
        }
        self.delay.delay_ms(hold_ms).await;

        let mut last = Error::TransportNotReady;
        for _ in 0..RELEASE_ATTEMPTS {
            match self.send_when_ready(KeyboardReport::released()).await {
                Ok(()) => return Ok(()),
                Err(e) => last = e,
            }
        }
        error!("sequencer: release not sent, key may be held: {}", last);
        Err(self.fail(last))
    }

    /// Emit `report`, polling the transport while it reports not ready.
    /// Bounded by the HID timeout.
    async fn send_when_ready(&mut self, report: KeyboardReport) -> Result<(), Error> {
        let limit = self.timing().hid_timeout_ms;
        let poll_ms = self.poll_ms();
        let mut waited_ms: u32 = 0;
        loop {
            match self.emitter.emit(report).await {
                Err(Error::TransportNotReady) => {
                    if limit.is_some_and(|limit| waited_ms >= limit) {
                        return Err(Error::TransportNotReady);
                    }
                    self.delay.delay_ms(poll_ms).await;
                    waited_ms = waited_ms.saturating_add(poll_ms);
                }
                other => return other,
            }
        }
    }
}
