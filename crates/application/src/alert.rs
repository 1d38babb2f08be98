//! Alert construction for the configured output.

use std::path::Path;
use std::sync::Arc;
use welfare_audio::AudioAlert;

/// Build the arrival alert. Without the `playback` feature every alert
/// rings the terminal bell and a configured asset is ignored.
#[cfg(not(feature = "playback"))]
pub fn build_alert(asset_path: Option<&Path>) -> AudioAlert {
    if let Some(path) = asset_path {
        tracing::warn!(
            path = %path.display(),
            "alert asset ignored, built without playback support"
        );
    }
    AudioAlert::new(None, Arc::new(welfare_audio::TerminalBell))
}

/// Build the arrival alert on the default output device. An asset that
/// fails to load leaves only the synthesized tone.
#[cfg(feature = "playback")]
pub fn build_alert(asset_path: Option<&Path>) -> AudioAlert {
    use welfare_audio::{AlertAsset, AssetPlayer, CpalAssetPlayer, CpalToneBackend};

    let player = asset_path.and_then(|path| match AlertAsset::from_path(path) {
        Ok(asset) => Some(Arc::new(CpalAssetPlayer::new(asset)) as Arc<dyn AssetPlayer>),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "alert asset unavailable");
            None
        }
    });
    AudioAlert::new(player, Arc::new(CpalToneBackend))
}
