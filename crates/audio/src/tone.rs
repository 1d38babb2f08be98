//! Procedural alert tone.
//!
//! A short sine burst shaped by an exponential attack/release envelope. The
//! envelope starts and ends at [`ENVELOPE_FLOOR`] rather than zero so both
//! ramps stay exponential and the burst has no audible click at either edge.

use dasp::signal::{self, Signal};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gain the envelope starts from and decays back to.
pub const ENVELOPE_FLOOR: f64 = 0.0001;

/// Parameters of the fallback tone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    /// Total length of the burst.
    #[serde(with = "millis")]
    pub duration: Duration,
    /// Time to ramp from the floor to `peak_gain`.
    #[serde(with = "millis")]
    pub attack: Duration,
    pub peak_gain: f64,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            duration: Duration::from_millis(180),
            attack: Duration::from_millis(10),
            peak_gain: 0.2,
        }
    }
}

impl ToneSpec {
    /// Envelope gain at `t` seconds into the burst.
    pub fn envelope_at(&self, t: f64) -> f64 {
        let total = self.duration.as_secs_f64();
        let attack = self.attack.as_secs_f64().min(total);
        let peak = self.peak_gain.max(ENVELOPE_FLOOR);

        if t <= 0.0 {
            ENVELOPE_FLOOR
        } else if t < attack {
            ENVELOPE_FLOOR * (peak / ENVELOPE_FLOOR).powf(t / attack)
        } else if t < total {
            let release = total - attack;
            peak * (ENVELOPE_FLOOR / peak).powf((t - attack) / release)
        } else {
            ENVELOPE_FLOOR
        }
    }

    /// Number of samples the burst spans at `sample_rate`.
    pub fn sample_count(&self, sample_rate: u32) -> usize {
        (self.duration.as_secs_f64() * sample_rate as f64).round() as usize
    }

    /// Render the burst as mono f32 samples.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = sample_rate as f64;
        signal::rate(rate)
            .const_hz(self.frequency_hz)
            .sine()
            .take(self.sample_count(sample_rate))
            .enumerate()
            .map(|(i, s)| (s * self.envelope_at(i as f64 / rate)) as f32)
            .collect()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_length_matches_duration() {
        let tone = ToneSpec::default();
        assert_eq!(tone.render(48_000).len(), 8_640);
        assert_eq!(tone.render(16_000).len(), 2_880);
    }

    #[test]
    fn test_edges_are_quiet() {
        let samples = ToneSpec::default().render(48_000);
        assert!(samples[0].abs() < 1e-3);
        assert!(samples[samples.len() - 1].abs() < 1e-3);
    }

    #[test]
    fn test_peak_bounded_by_gain() {
        let tone = ToneSpec::default();
        let samples = tone.render(48_000);
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= tone.peak_gain as f32 + 1e-6);
        assert!(peak > tone.peak_gain as f32 * 0.5);
    }

    #[test]
    fn test_envelope_rises_then_falls() {
        let tone = ToneSpec::default();
        let attack = tone.attack.as_secs_f64();
        assert!(tone.envelope_at(attack * 0.5) < tone.envelope_at(attack * 0.99));
        assert!(tone.envelope_at(0.05) > tone.envelope_at(0.15));
        assert_eq!(tone.envelope_at(1.0), ENVELOPE_FLOOR);
    }

    #[test]
    fn test_spec_deserializes_millis() {
        let spec: ToneSpec = serde_json::from_str(r#"{"duration": 250}"#).unwrap();
        assert_eq!(spec.duration, Duration::from_millis(250));
        assert_eq!(spec.frequency_hz, 880.0);
    }
}
