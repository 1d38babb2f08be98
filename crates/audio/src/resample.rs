//! Sample-rate conversion for alert buffers.

use dasp::interpolate::linear::Linear;
use dasp::signal::{self, Signal};

/// Convert mono `samples` from `from_hz` to `to_hz` with linear
/// interpolation. Equal rates return a copy.
pub fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Vec<f32> {
    if from_hz == to_hz || samples.is_empty() || from_hz == 0 || to_hz == 0 {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_hz as u64).div_ceil(from_hz as u64) as usize;
    let mut source = signal::from_iter(samples.iter().copied());
    let first = source.next();
    let second = source.next();
    source
        .from_hz_to_hz(Linear::new(first, second), from_hz as f64, to_hz as f64)
        .take(out_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(resample(&samples, 48_000, 48_000), samples);
    }

    #[test]
    fn test_length_follows_rate_ratio() {
        let samples = vec![0.0; 44_100];
        assert_eq!(resample(&samples, 44_100, 48_000).len(), 48_000);
        assert_eq!(resample(&samples, 44_100, 22_050).len(), 22_050);
    }

    #[test]
    fn test_interpolates_between_samples() {
        let up = resample(&[0.0, 1.0, 0.0, -1.0], 1, 2);
        assert_eq!(up.len(), 8);
        assert!((up[1] - 0.5).abs() < 1e-6);
        assert!((up[2] - 1.0).abs() < 1e-6);
        assert!((up[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_constant_signal_stays_constant() {
        let samples = vec![0.25; 441];
        let out = resample(&samples, 44_100, 48_000);
        assert!(out[..400].iter().all(|s| (s - 0.25).abs() < 1e-6));
    }
}
