//! Output seams for alert playback.
//!
//! [`AssetPlayer`] is the primary tier (a preloaded sound with play/pause
//! and mute controls). [`ToneBackend`] is the fallback tier: each emission
//! opens a fresh [`ToneVoice`], plays the synthesized burst, and drops the
//! voice to release the synthesis resource.

use crate::Result;
use std::io::Write;

/// Primary-tier player for the preloaded alert asset.
pub trait AssetPlayer: Send + Sync {
    /// Seek back to the first sample.
    fn rewind(&self);

    fn set_muted(&self, muted: bool);

    /// Start playback from the current position.
    fn play(&self) -> Result<()>;

    fn pause(&self);
}

/// Fallback-tier synthesis output.
pub trait ToneBackend: Send + Sync {
    /// Acquire an output voice for one tone.
    fn open(&self) -> Result<Box<dyn ToneVoice>>;
}

/// One acquired synthesis output. Dropping it releases the resource.
pub trait ToneVoice: Send {
    /// Rate the voice expects samples at.
    fn sample_rate(&self) -> u32;

    fn play(&mut self, samples: &[f32]) -> Result<()>;
}

/// Fallback backend for hosts without an audio device: rings the terminal
/// bell on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

struct BellVoice;

impl ToneBackend for TerminalBell {
    fn open(&self) -> Result<Box<dyn ToneVoice>> {
        Ok(Box::new(BellVoice))
    }
}

impl ToneVoice for BellVoice {
    fn sample_rate(&self) -> u32 {
        8000
    }

    fn play(&mut self, _samples: &[f32]) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}
