//! Audible alert with a two-tier playback strategy.
//!
//! 1. Primary: replay the preloaded asset from the start.
//! 2. Fallback: synthesize a short tone and play it on a fresh voice.
//!
//! Many hosts refuse playback until the user has interacted with the
//! application. [`AudioAlert::unlock_with_gesture`] performs the one-time
//! muted play/pause that satisfies such hosts. Every failure at every tier
//! is logged and swallowed; callers only ever see an [`AlertOutcome`].

use crate::output::{AssetPlayer, ToneBackend};
use crate::tone::ToneSpec;
use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Whether the host-imposed gesture requirement has been addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// No user gesture seen yet; the asset may be blocked.
    AwaitingGesture,
    /// The one-time unlock has been attempted.
    Unlocked,
}

/// Which tier, if any, produced sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Primary,
    Fallback,
    Silent,
}

/// Per-tier counters, mostly for diagnostics and tests.
#[derive(Debug, Default)]
pub struct AlertStats {
    primary: AtomicU64,
    fallback: AtomicU64,
    silent: AtomicU64,
}

impl AlertStats {
    pub fn primary(&self) -> u64 {
        self.primary.load(Ordering::Relaxed)
    }

    pub fn fallback(&self) -> u64 {
        self.fallback.load(Ordering::Relaxed)
    }

    pub fn silent(&self) -> u64 {
        self.silent.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.primary() + self.fallback() + self.silent()
    }

    fn record(&self, outcome: AlertOutcome) {
        let counter = match outcome {
            AlertOutcome::Primary => &self.primary,
            AlertOutcome::Fallback => &self.fallback,
            AlertOutcome::Silent => &self.silent,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct AudioAlert {
    player: Option<Arc<dyn AssetPlayer>>,
    tones: Arc<dyn ToneBackend>,
    tone: ToneSpec,
    gesture: Mutex<GestureState>,
    stats: AlertStats,
}

impl AudioAlert {
    /// `player` is `None` when no asset is configured; every alert then
    /// goes straight to the synthesized tone.
    pub fn new(player: Option<Arc<dyn AssetPlayer>>, tones: Arc<dyn ToneBackend>) -> Self {
        Self {
            player,
            tones,
            tone: ToneSpec::default(),
            gesture: Mutex::new(GestureState::AwaitingGesture),
            stats: AlertStats::default(),
        }
    }

    pub fn with_tone(mut self, tone: ToneSpec) -> Self {
        self.tone = tone;
        self
    }

    pub fn gesture_state(&self) -> GestureState {
        *self.gesture.lock().expect("gesture state mutex poisoned")
    }

    pub fn stats(&self) -> &AlertStats {
        &self.stats
    }

    /// Play the alert once. Never fails.
    pub fn play(&self) -> AlertOutcome {
        let outcome = match self.play_primary() {
            Ok(true) => AlertOutcome::Primary,
            Ok(false) => self.play_fallback(),
            Err(e) => {
                tracing::debug!(error = %e, "primary alert playback failed, using tone");
                self.play_fallback()
            }
        };
        self.stats.record(outcome);
        tracing::trace!(?outcome, "alert played");
        outcome
    }

    fn play_primary(&self) -> Result<bool> {
        let Some(player) = &self.player else {
            return Ok(false);
        };
        player.rewind();
        player.play()?;
        Ok(true)
    }

    fn play_fallback(&self) -> AlertOutcome {
        match self.play_tone() {
            Ok(()) => AlertOutcome::Fallback,
            Err(e) => {
                tracing::debug!(error = %e, "fallback tone failed");
                AlertOutcome::Silent
            }
        }
    }

    fn play_tone(&self) -> Result<()> {
        let mut voice = self.tones.open()?;
        let samples = self.tone.render(voice.sample_rate());
        let result = voice.play(&samples);
        drop(voice);
        result
    }

    /// Satisfy the host's user-gesture requirement for the primary asset.
    ///
    /// Plays the asset muted and pauses it at once, then un-mutes. Runs at
    /// most once per alert; returns whether this call performed the attempt.
    /// A failed attempt is not retried here: later alerts fall back to the
    /// tone on their own.
    pub fn unlock_with_gesture(&self) -> bool {
        {
            let mut gesture = self.gesture.lock().expect("gesture state mutex poisoned");
            if *gesture == GestureState::Unlocked {
                return false;
            }
            *gesture = GestureState::Unlocked;
        }

        let Some(player) = &self.player else {
            tracing::debug!("gesture unlock skipped, no alert asset");
            return true;
        };

        player.set_muted(true);
        match player.play() {
            Ok(()) => tracing::debug!("alert asset unlocked by user gesture"),
            Err(e) => tracing::debug!(error = %e, "gesture unlock playback failed"),
        }
        player.pause();
        player.rewind();
        player.set_muted(false);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ToneVoice;
    use crate::AudioError;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct FakePlayer {
        blocked: AtomicBool,
        muted: AtomicBool,
        log: Mutex<Vec<String>>,
    }

    impl FakePlayer {
        fn blocked() -> Self {
            let player = Self::default();
            player.blocked.store(true, Ordering::SeqCst);
            player
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl AssetPlayer for FakePlayer {
        fn rewind(&self) {
            self.log.lock().unwrap().push("rewind".into());
        }

        fn set_muted(&self, muted: bool) {
            self.muted.store(muted, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("muted={muted}"));
        }

        fn play(&self) -> Result<()> {
            self.log.lock().unwrap().push("play".into());
            if self.blocked.load(Ordering::SeqCst) {
                return Err(AudioError::Playback("not allowed before gesture".into()));
            }
            Ok(())
        }

        fn pause(&self) {
            self.log.lock().unwrap().push("pause".into());
        }
    }

    #[derive(Default)]
    struct FakeTones {
        broken: bool,
        opened: AtomicU64,
        released: Arc<AtomicU64>,
    }

    struct FakeVoice {
        released: Arc<AtomicU64>,
    }

    impl Drop for FakeVoice {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ToneVoice for FakeVoice {
        fn sample_rate(&self) -> u32 {
            16_000
        }

        fn play(&mut self, _samples: &[f32]) -> Result<()> {
            Ok(())
        }
    }

    impl ToneBackend for FakeTones {
        fn open(&self) -> Result<Box<dyn ToneVoice>> {
            if self.broken {
                return Err(AudioError::Playback("no output device".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeVoice {
                released: Arc::clone(&self.released),
            }))
        }
    }

    #[test]
    fn test_primary_plays_from_start() {
        let player = Arc::new(FakePlayer::default());
        let alert = AudioAlert::new(Some(player.clone()), Arc::new(FakeTones::default()));

        assert_eq!(alert.play(), AlertOutcome::Primary);
        assert_eq!(player.log(), vec!["rewind", "play"]);
        assert_eq!(alert.stats().primary(), 1);
    }

    #[test]
    fn test_blocked_primary_falls_back_and_releases_voice() {
        let tones = Arc::new(FakeTones::default());
        let alert = AudioAlert::new(Some(Arc::new(FakePlayer::blocked())), tones.clone());

        assert_eq!(alert.play(), AlertOutcome::Fallback);
        assert_eq!(tones.opened.load(Ordering::SeqCst), 1);
        assert_eq!(tones.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_asset_uses_tone() {
        let alert = AudioAlert::new(None, Arc::new(FakeTones::default()));
        assert_eq!(alert.play(), AlertOutcome::Fallback);
    }

    #[test]
    fn test_every_tier_failing_is_silent() {
        let tones = Arc::new(FakeTones {
            broken: true,
            ..Default::default()
        });
        let alert = AudioAlert::new(Some(Arc::new(FakePlayer::blocked())), tones);

        assert_eq!(alert.play(), AlertOutcome::Silent);
        assert_eq!(alert.stats().silent(), 1);
    }

    #[test]
    fn test_gesture_unlock_runs_once_and_unmutes() {
        let player = Arc::new(FakePlayer::default());
        let alert = AudioAlert::new(Some(player.clone()), Arc::new(FakeTones::default()));
        assert_eq!(alert.gesture_state(), GestureState::AwaitingGesture);

        assert!(alert.unlock_with_gesture());
        assert!(!alert.unlock_with_gesture());

        assert_eq!(alert.gesture_state(), GestureState::Unlocked);
        assert_eq!(
            player.log(),
            vec!["muted=true", "play", "pause", "rewind", "muted=false"]
        );
        assert!(!player.muted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_failed_gesture_unlock_is_not_fatal() {
        let player = Arc::new(FakePlayer::blocked());
        let alert = AudioAlert::new(Some(player.clone()), Arc::new(FakeTones::default()));

        assert!(alert.unlock_with_gesture());
        assert_eq!(alert.gesture_state(), GestureState::Unlocked);
        assert!(!player.muted.load(Ordering::SeqCst));
        assert_eq!(alert.play(), AlertOutcome::Fallback);
    }
}
