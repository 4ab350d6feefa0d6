use serde::{Deserialize, Serialize};

/// Sample rate assumed when a buffer does not carry its own.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Longest track the engine will lay pulses out for, in seconds.
pub const MAX_TRACK_DURATION: f64 = 24.0 * 60.0 * 60.0;

/// Analysed music track handed to the engine by the external decoding and
/// analysis collaborators. The core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Track length in seconds.
    pub duration: f64,
    pub bpm: f64,
    /// Ordered, non-negative beat timestamps in seconds, each `<= duration`.
    #[serde(default)]
    pub beats: Vec<f64>,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>, duration: f64, bpm: f64, beats: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            artist: String::new(),
            duration,
            bpm,
            beats,
        }
    }

    pub fn with_metadata(mut self, title: impl Into<String>, artist: impl Into<String>) -> Self {
        self.title = title.into();
        self.artist = artist.into();
        self
    }

    /// Duration sanitised to a finite value in `[0, MAX_TRACK_DURATION]`.
    pub fn safe_duration(&self) -> f64 {
        if self.duration.is_finite() {
            self.duration.clamp(0.0, MAX_TRACK_DURATION)
        } else {
            0.0
        }
    }
}

/// Mono PCM samples together with the rate they were captured at. Decoding
/// happens elsewhere; this is the hand-off shape for beat detection.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Length of the buffer in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Parses raw little-endian `f32` samples, ignoring a trailing partial
    /// sample.
    pub fn from_f32_le_bytes(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::new(samples, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_derived_from_sample_count() {
        let buffer = PcmBuffer::new(vec![0.0; 22_050], 44_100);
        assert!((buffer.duration_seconds() - 0.5).abs() < 1e-12);
        assert_eq!(PcmBuffer::new(vec![0.0; 10], 0).duration_seconds(), 0.0);
    }

    #[test]
    fn parses_little_endian_samples() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5_f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0_f32).to_le_bytes());
        bytes.push(0xff);

        let buffer = PcmBuffer::from_f32_le_bytes(&bytes, 8_000);
        assert_eq!(buffer.samples, vec![0.5, -1.0]);
        assert_eq!(buffer.sample_rate, 8_000);
    }

    #[test]
    fn track_deserializes_with_optional_metadata() {
        let track: AudioTrack =
            serde_json::from_str(r#"{"id":"t1","duration":10.0,"bpm":120.0,"beats":[0.0,0.5]}"#)
                .unwrap();
        assert_eq!(track.id, "t1");
        assert!(track.title.is_empty());
        assert_eq!(track.beats, vec![0.0, 0.5]);
    }

    #[test]
    fn safe_duration_rejects_non_finite_values() {
        let track = AudioTrack::new("t", f64::NAN, 120.0, Vec::new());
        assert_eq!(track.safe_duration(), 0.0);
        let track = AudioTrack::new("t", -3.0, 120.0, Vec::new());
        assert_eq!(track.safe_duration(), 0.0);
    }

    #[test]
    fn safe_duration_caps_absurd_lengths() {
        let track = AudioTrack::new("t", 1e300, 120.0, Vec::new());
        assert_eq!(track.safe_duration(), MAX_TRACK_DURATION);
        let track = AudioTrack::new("t", 180.0, 120.0, Vec::new());
        assert_eq!(track.safe_duration(), 180.0);
    }
}
