//! Error types for host input handling.

use thiserror::Error;

/// Errors raised while configuring input handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// The shortcut string has no key after its modifiers (e.g. "ctrl+").
    #[error("shortcut has no key: {0:?}")]
    MissingKey(String),

    /// A segment before the final key is not a known modifier.
    #[error("unknown modifier {modifier:?} in shortcut {shortcut:?}")]
    UnknownModifier { shortcut: String, modifier: String },

    /// A lock shortcut without modifiers would fire on ordinary typing.
    #[error("shortcut {0:?} needs at least one modifier")]
    NoModifier(String),
}
