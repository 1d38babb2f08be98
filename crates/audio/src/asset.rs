//! Preloaded alert asset.
//!
//! The primary alert sound is decoded once at startup into mono f32 samples
//! so that playing it later never touches the filesystem.

use crate::{AudioError, Result};
use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Decoded alert sound.
#[derive(Debug, Clone)]
pub struct AlertAsset {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AlertAsset {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Decode a WAV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .map_err(|e| AudioError::Asset(format!("failed to open {}: {e}", path.display())))?;
        let asset = Self::decode(reader)?;
        tracing::debug!(
            path = %path.display(),
            samples = asset.samples.len(),
            sample_rate = asset.sample_rate,
            "alert asset loaded"
        );
        Ok(asset)
    }

    /// Decode WAV data from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let reader =
            WavReader::new(reader).map_err(|e| AudioError::Asset(format!("invalid wav: {e}")))?;
        Self::decode(reader)
    }

    fn decode<R: Read>(mut reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| AudioError::Asset(format!("failed to read samples: {e}")))?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| AudioError::Asset(format!("failed to read samples: {e}")))?
            }
        };

        if interleaved.is_empty() {
            return Err(AudioError::Asset("wav contains no samples".to_string()));
        }

        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self::new(mono, spec.sample_rate))
    }

    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_wav(path: &Path, spec: WavSpec, frames: &[i16]) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_mono_int_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chime.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[0, 16384, -16384, 0]);

        let asset = AlertAsset::from_path(&path).unwrap();
        assert_eq!(asset.sample_rate(), 16000);
        assert_eq!(asset.samples().len(), 4);
        assert!((asset.samples()[1] - 0.5).abs() < 1e-4);
        assert!((asset.samples()[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[16384, 0, 16384, 16384]);

        let asset = AlertAsset::from_path(&path).unwrap();
        assert_eq!(asset.samples().len(), 2);
        assert!((asset.samples()[0] - 0.25).abs() < 1e-4);
        assert!((asset.samples()[1] - 0.5).abs() < 1e-4);
        assert_eq!(asset.duration_ms(), 0);
    }

    #[test]
    fn test_missing_file_is_asset_error() {
        let err = AlertAsset::from_path("/nonexistent/chime.wav").unwrap_err();
        assert!(matches!(err, AudioError::Asset(_)));
    }

    #[test]
    fn test_garbage_reader_is_rejected() {
        let err = AlertAsset::from_reader(&b"not a wav file"[..]).unwrap_err();
        assert!(matches!(err, AudioError::Asset(_)));
    }
}
