//! Device output through cpal.
//!
//! cpal streams are not `Send` on every platform, so each playback builds
//! its stream on a short-lived thread and keeps it alive there until the
//! samples run out or the player is paused. Build errors are handed back to
//! the caller before the thread starts playing, so a blocked or missing
//! device still triggers the fallback tier.

use crate::asset::AlertAsset;
use crate::output::{AssetPlayer, ToneBackend, ToneVoice};
use crate::resample::resample;
use crate::{AudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Granularity of the stop-flag check while a stream is alive.
const STOP_POLL: Duration = Duration::from_millis(10);

/// Extra time a stream is kept after its last sample so the device drains.
const DRAIN_MARGIN: Duration = Duration::from_millis(50);

fn default_output_rate() -> Result<u32> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceNotFound("default output".to_string()))?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::Playback(format!("failed to get default config: {e}")))?;
    Ok(config.sample_rate().0)
}

/// Play `samples` on the default output device from a background thread.
///
/// The buffer is resampled to the device rate once, before the stream is
/// built, so the output callback only copies.
fn spawn_output(
    samples: Arc<[f32]>,
    source_rate: u32,
    muted: bool,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

    std::thread::spawn(move || {
        let host = cpal::default_host();
        let Some(device) = host.default_output_device() else {
            let _ = ready_tx.send(Err(AudioError::DeviceNotFound("default output".to_string())));
            return;
        };
        let config = match device.default_output_config() {
            Ok(c) => c,
            Err(e) => {
                let _ = ready_tx.send(Err(AudioError::Playback(format!(
                    "failed to get default config: {e}"
                ))));
                return;
            }
        };

        let out_rate = config.sample_rate().0;
        let gain = if muted { 0.0 } else { 1.0 };
        let buffer: Arc<[f32]> = resample(&samples, source_rate, out_rate)
            .into_iter()
            .map(|s| s * gain)
            .collect();
        let length = Duration::from_secs_f64(buffer.len() as f64 / out_rate.max(1) as f64);

        let stream = match config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&buffer)),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&buffer)),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&buffer)),
            format => Err(AudioError::Playback(format!(
                "unsupported output format {format:?}"
            ))),
        };
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(AudioError::Playback(format!(
                "failed to start stream: {e}"
            ))));
            return;
        }
        let _ = ready_tx.send(Ok(()));

        let length = length + DRAIN_MARGIN;
        let mut elapsed = Duration::ZERO;
        while elapsed < length && !stop.load(Ordering::SeqCst) {
            std::thread::sleep(STOP_POLL);
            elapsed += STOP_POLL;
        }
        drop(stream);
    });

    ready_rx
        .recv()
        .map_err(|_| AudioError::Playback("output thread exited".to_string()))?
}

/// Build a stream that writes `buffer` to every channel of each frame,
/// then silence.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::SupportedStreamConfig,
    buffer: Arc<[f32]>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels() as usize;
    let mut position = 0usize;
    device
        .build_output_stream(
            &config.config(),
            move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in out.chunks_mut(channels) {
                    let value = buffer.get(position).copied().unwrap_or(0.0);
                    frame.iter_mut().for_each(|o| *o = T::from_sample(value));
                    position += 1;
                }
            },
            |e| tracing::debug!(error = %e, "alert output stream error"),
            None,
        )
        .map_err(|e| AudioError::Playback(format!("failed to build stream: {e}")))
}

/// Primary-tier player for a preloaded [`AlertAsset`].
pub struct CpalAssetPlayer {
    asset: AlertAsset,
    muted: AtomicBool,
    current_stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl CpalAssetPlayer {
    pub fn new(asset: AlertAsset) -> Self {
        Self {
            asset,
            muted: AtomicBool::new(false),
            current_stop: Mutex::new(None),
        }
    }
}

impl AssetPlayer for CpalAssetPlayer {
    fn rewind(&self) {
        // Each play starts a fresh stream at sample zero; rewinding means
        // stopping whatever is still sounding.
        self.pause();
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    fn play(&self) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        spawn_output(
            Arc::clone(self.asset.samples()),
            self.asset.sample_rate(),
            self.muted.load(Ordering::SeqCst),
            Arc::clone(&stop),
        )?;
        *self.current_stop.lock().expect("player mutex poisoned") = Some(stop);
        Ok(())
    }

    fn pause(&self) {
        if let Some(stop) = self.current_stop.lock().expect("player mutex poisoned").take() {
            stop.store(true, Ordering::SeqCst);
        }
    }
}

/// Fallback-tier backend on the default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalToneBackend;

struct CpalVoice {
    sample_rate: u32,
    stop: Arc<AtomicBool>,
}

impl ToneBackend for CpalToneBackend {
    fn open(&self) -> Result<Box<dyn ToneVoice>> {
        Ok(Box::new(CpalVoice {
            sample_rate: default_output_rate()?,
            stop: Arc::new(AtomicBool::new(false)),
        }))
    }
}

impl ToneVoice for CpalVoice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, samples: &[f32]) -> Result<()> {
        spawn_output(
            Arc::from(samples),
            self.sample_rate,
            false,
            Arc::clone(&self.stop),
        )
    }
}
