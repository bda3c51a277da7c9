//! Character → HID usage mapping for the characters the injector can type.
//!
//! Only a closed ASCII subset is supported (US layout):
//!
//! ```text
//! a-z A-Z        letters (uppercase asserts Left Shift)
//! 0-9            digits
//! ' ' : \ . _ / ( )
//! ```
//!
//! Anything else is [`Unmappable`]; the sequencer skips such characters
//! instead of aborting the script.

use core::ops::{BitOr, BitOrAssign};

/// USB HID keyboard/keypad usage codes (usage page 0x07) used by the injector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Keycode {
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,
    Num1 = 0x1E,
    Num2 = 0x1F,
    Num3 = 0x20,
    Num4 = 0x21,
    Num5 = 0x22,
    Num6 = 0x23,
    Num7 = 0x24,
    Num8 = 0x25,
    Num9 = 0x26,
    Num0 = 0x27,
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Backslash = 0x31,
    Semicolon = 0x33,
    Period = 0x37,
    Slash = 0x38,
}

impl Keycode {
    /// Raw usage byte as it appears in a keyboard report.
    pub const fn usage(self) -> u8 {
        self as u8
    }
}

const LETTERS: [Keycode; 26] = [
    Keycode::A,
    Keycode::B,
    Keycode::C,
    Keycode::D,
    Keycode::E,
    Keycode::F,
    Keycode::G,
    Keycode::H,
    Keycode::I,
    Keycode::J,
    Keycode::K,
    Keycode::L,
    Keycode::M,
    Keycode::N,
    Keycode::O,
    Keycode::P,
    Keycode::Q,
    Keycode::R,
    Keycode::S,
    Keycode::T,
    Keycode::U,
    Keycode::V,
    Keycode::W,
    Keycode::X,
    Keycode::Y,
    Keycode::Z,
];

// Indexed by digit value, so '0' comes first even though its usage is last.
const DIGITS: [Keycode; 10] = [
    Keycode::Num0,
    Keycode::Num1,
    Keycode::Num2,
    Keycode::Num3,
    Keycode::Num4,
    Keycode::Num5,
    Keycode::Num6,
    Keycode::Num7,
    Keycode::Num8,
    Keycode::Num9,
];

/// Modifier byte of a boot keyboard report.
///
/// ```text
/// Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
/// Bit 2 = Left Alt,   Bit 3 = Left GUI,
/// Bit 4 = Right Ctrl, Bit 5 = Right Shift,
/// Bit 6 = Right Alt,  Bit 7 = Right GUI
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Self = Self(0);
    pub const LEFT_CTRL: Self = Self(0x01);
    pub const LEFT_SHIFT: Self = Self(0x02);
    pub const LEFT_ALT: Self = Self(0x04);
    pub const LEFT_GUI: Self = Self(0x08);
    pub const RIGHT_CTRL: Self = Self(0x10);
    pub const RIGHT_SHIFT: Self = Self(0x20);
    pub const RIGHT_ALT: Self = Self(0x40);
    pub const RIGHT_GUI: Self = Self(0x80);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A single key stroke: one usage plus the modifiers held with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub keycode: Keycode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub const fn new(keycode: Keycode, modifiers: Modifiers) -> Self {
        Self { keycode, modifiers }
    }

    pub const fn plain(keycode: Keycode) -> Self {
        Self::new(keycode, Modifiers::NONE)
    }

    pub const fn shifted(keycode: Keycode) -> Self {
        Self::new(keycode, Modifiers::LEFT_SHIFT)
    }
}

/// Character outside the supported set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Unmappable(pub char);

/// Map a character to the key stroke that types it on a US layout.
pub fn map(ch: char) -> Result<KeyEvent, Unmappable> {
    let event = match ch {
        'a'..='z' => KeyEvent::plain(LETTERS[(ch as u8 - b'a') as usize]),
        'A'..='Z' => KeyEvent::shifted(LETTERS[(ch as u8 - b'A') as usize]),
        '0'..='9' => KeyEvent::plain(DIGITS[(ch as u8 - b'0') as usize]),
        ' ' => KeyEvent::plain(Keycode::Space),
        ':' => KeyEvent::plain(Keycode::Semicolon),
        '\\' => KeyEvent::plain(Keycode::Backslash),
        '.' => KeyEvent::plain(Keycode::Period),
        '_' => KeyEvent::shifted(Keycode::Minus),
        '/' => KeyEvent::plain(Keycode::Slash),
        '(' => KeyEvent::shifted(Keycode::Num9),
        ')' => KeyEvent::shifted(Keycode::Num0),
        _ => return Err(Unmappable(ch)),
    };
    Ok(event)
}
