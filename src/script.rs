//! Keystroke script: an ordered list of phases typed by the sequencer.

use crate::config::DEFAULT_COMMAND;
use crate::error::Error;
use crate::keymap::{Keycode, Modifiers};
use heapless::Vec;

/// Maximum number of phases in one script.
pub const MAX_PHASES: usize = 16;

/// One step of an injection script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase<'a> {
    /// Press `key` with `modifiers` held, then release everything.
    ChordPress { modifiers: Modifiers, key: Keycode },
    /// Type each character through the key map, skipping unmappable ones.
    LiteralString(&'a str),
    /// Press and release a single key with no modifiers.
    KeyPress(Keycode),
}

/// Ordered, bounded list of [`Phase`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectionScript<'a> {
    phases: Vec<Phase<'a>, MAX_PHASES>,
}

impl<'a> InjectionScript<'a> {
    pub const fn new() -> Self {
        Self { phases: Vec::new() }
    }

    /// Win+R, the given command, Enter.
    pub fn run_dialog(command: &'a str) -> Self {
        let mut phases = Vec::new();
        // Capacity is well above three.
        let _ = phases.push(Phase::ChordPress {
            modifiers: Modifiers::LEFT_GUI,
            key: Keycode::R,
        });
        let _ = phases.push(Phase::LiteralString(command));
        let _ = phases.push(Phase::KeyPress(Keycode::Enter));
        Self { phases }
    }

    pub fn push(&mut self, phase: Phase<'a>) -> Result<(), Error> {
        self.phases.push(phase).map_err(|_| Error::ScriptFull)
    }

    pub fn chord(mut self, modifiers: Modifiers, key: Keycode) -> Result<Self, Error> {
        self.push(Phase::ChordPress { modifiers, key })?;
        Ok(self)
    }

    pub fn literal(mut self, text: &'a str) -> Result<Self, Error> {
        self.push(Phase::LiteralString(text))?;
        Ok(self)
    }

    pub fn key(mut self, key: Keycode) -> Result<Self, Error> {
        self.push(Phase::KeyPress(key))?;
        Ok(self)
    }

    pub fn phases(&self) -> &[Phase<'a>] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

impl<'a> Default for InjectionScript<'a> {
    fn default() -> Self {
        Self::run_dialog(DEFAULT_COMMAND)
    }
}
