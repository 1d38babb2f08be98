//! Key chords and the session lock shortcut.
//!
//! A chord is a key plus the modifiers held when it went down. The lock
//! shortcut is parsed from a config string such as `"ctrl+shift+l"`.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default chord that locks the session immediately.
pub const DEFAULT_LOCK_SHORTCUT: &str = "ctrl+shift+l";

/// A key press together with its modifier state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    /// Key name, lowercased (`"l"`, `"escape"`, `"f12"`).
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyChord {
    /// A chord for `key` with no modifiers held.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into().to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }

    /// Exact match on modifiers, case-insensitive match on the key.
    pub fn matches(&self, pressed: &KeyChord) -> bool {
        self.ctrl == pressed.ctrl
            && self.alt == pressed.alt
            && self.shift == pressed.shift
            && self.meta == pressed.meta
            && self.key.eq_ignore_ascii_case(&pressed.key)
    }
}

impl FromStr for KeyChord {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = match parts.pop() {
            Some(k) if !k.is_empty() => k,
            _ => return Err(InputError::MissingKey(s.to_string())),
        };

        let mut chord = KeyChord::key(key);
        for modifier in parts {
            match modifier.to_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "alt" | "option" => chord.alt = true,
                "shift" => chord.shift = true,
                "meta" | "cmd" | "super" => chord.meta = true,
                _ => {
                    return Err(InputError::UnknownModifier {
                        shortcut: s.to_string(),
                        modifier: modifier.to_string(),
                    })
                }
            }
        }
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.alt {
            f.write_str("alt+")?;
        }
        if self.shift {
            f.write_str("shift+")?;
        }
        if self.meta {
            f.write_str("meta+")?;
        }
        f.write_str(&self.key)
    }
}

/// Parse a lock shortcut, rejecting chords without modifiers.
pub fn parse_lock_shortcut(s: &str) -> Result<KeyChord, InputError> {
    let chord: KeyChord = s.parse()?;
    if !chord.has_modifier() {
        return Err(InputError::NoModifier(s.to_string()));
    }
    Ok(chord)
}
