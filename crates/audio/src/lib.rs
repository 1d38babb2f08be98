mod alert;
mod asset;
mod output;
mod resample;
mod tone;

#[cfg(feature = "playback")]
mod playback;

pub use alert::{AlertOutcome, AlertStats, AudioAlert, GestureState};
pub use asset::AlertAsset;
pub use output::{AssetPlayer, TerminalBell, ToneBackend, ToneVoice};
pub use resample::resample;
pub use tone::{ToneSpec, ENVELOPE_FLOOR};

#[cfg(feature = "playback")]
pub use playback::{CpalAssetPlayer, CpalToneBackend};

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("asset error: {0}")]
    Asset(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AudioError>;
