//! Types related to the keyboard.

use bitflags::bitflags;
pub use keyboard_types::{Code as KeyCode, NamedKey};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
pub use smol_str::SmolStr;

/// The logical meaning of a key press, after the active keyboard layout has been applied.
///
/// This is independent of any IME transformation: text produced by an input method arrives as
/// [`Event::TextInput`] instead.
///
/// [`Event::TextInput`]: crate::event::Event::TextInput
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Key {
    /// A key with a well-known name, such as `Enter` or `ArrowLeft`.
    Named(NamedKey),
    /// A key producing a string when pressed with the current modifiers.
    Character(SmolStr),
    /// The native keysym couldn't be mapped.
    Unidentified(u32),
}

impl Key {
    /// Convert a key to its character, if it has one.
    pub fn to_text(&self) -> Option<&str> {
        match self {
            Key::Character(ch) => Some(ch.as_str()),
            _ => None,
        }
    }
}

impl From<NamedKey> for Key {
    #[inline]
    fn from(value: NamedKey) -> Self {
        Self::Named(value)
    }
}

bitflags! {
    /// The set of modifier keys held at the time an event was generated.
    ///
    /// Reflects physical key state, never the state an input method may have synthesized.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct KeyModifiersSet: u32 {
        /// The "control" key.
        const CTRL = 1 << 0;
        /// The "alt" key, "option" on Mac.
        const ALT = 1 << 1;
        /// The "shift" key.
        const SHIFT = 1 << 2;
        /// Caps lock is engaged.
        const CAPS_LOCK = 1 << 3;
        /// This is the "windows" key on PC and "command" key on Mac.
        const LOGO = 1 << 4;
        /// Num lock is engaged.
        const NUM_LOCK = 1 << 5;
        /// The "fn" key found on laptops.
        const FUNCTION = 1 << 6;
        /// The "help" key.
        const HELP = 1 << 7;
    }
}

impl KeyModifiersSet {
    /// Returns whether the shift modifier is active.
    pub fn shift_key(&self) -> bool {
        self.intersects(Self::SHIFT)
    }

    /// Returns whether the control modifier is active.
    pub fn control_key(&self) -> bool {
        self.intersects(Self::CTRL)
    }

    /// Returns whether the alt modifier is active.
    pub fn alt_key(&self) -> bool {
        self.intersects(Self::ALT)
    }

    /// Returns whether the logo modifier is active.
    pub fn logo_key(&self) -> bool {
        self.intersects(Self::LOGO)
    }

    /// The modifiers that take part in shortcuts, i.e. without the lock keys.
    pub fn without_locks(self) -> Self {
        self - (Self::CAPS_LOCK | Self::NUM_LOCK)
    }
}
