/// Decoded audio types
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Audio format information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate
    pub sample_rate: SampleRate,

    /// Number of interleaved channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl AudioFormat {
    /// Create a new audio format
    pub fn new(sample_rate: SampleRate, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Stereo at the given rate; the format every decoder in this workspace emits
    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(SampleRate::new(sample_rate), 2)
    }
}

/// Fully decoded clip audio
///
/// Samples are stored as f32 in the range [-1.0, 1.0],
/// interleaved: [L, R, L, R, ...] for stereo.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Audio samples (f32, interleaved)
    pub samples: Vec<f32>,

    /// Audio format information
    pub format: AudioFormat,
}

impl AudioBuffer {
    /// Create a new audio buffer
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// Buffer of `duration_secs` of silence
    pub fn silent(duration_secs: f64, format: AudioFormat) -> Self {
        let frames = (duration_secs * format.sample_rate.as_hz() as f64).round() as usize;
        Self::new(vec![0.0; frames * format.channels as usize], format)
    }

    /// Get the number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.format.channels == 0 {
            return 0;
        }
        self.samples.len() / self.format.channels as usize
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        let rate = self.format.sample_rate.as_hz();
        if rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / rate as f64
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Stereo frame at `index`; mono is duplicated, extra channels ignored
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        let channels = self.format.channels as usize;
        let base = index * channels;
        match channels {
            0 => (0.0, 0.0),
            1 => {
                let s = self.samples.get(base).copied().unwrap_or(0.0);
                (s, s)
            }
            _ => (
                self.samples.get(base).copied().unwrap_or(0.0),
                self.samples.get(base + 1).copied().unwrap_or(0.0),
            ),
        }
    }

    /// Linearly interpolated stereo frame at `position_secs` into the buffer
    ///
    /// Positions outside the buffer read as silence.
    #[inline]
    pub fn sample_at(&self, position_secs: f64) -> (f32, f32) {
        if position_secs < 0.0 {
            return (0.0, 0.0);
        }
        let exact = position_secs * self.format.sample_rate.as_hz() as f64;
        let index = exact.floor() as usize;
        let frames = self.frames();
        if index >= frames {
            return (0.0, 0.0);
        }
        let frac = (exact - index as f64) as f32;
        let (l0, r0) = self.frame(index);
        if frac == 0.0 || index + 1 >= frames {
            return (l0, r0);
        }
        let (l1, r1) = self.frame(index + 1);
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}
