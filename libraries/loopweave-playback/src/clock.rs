//! Audio clock
//!
//! Every deadline in the engine is expressed in seconds on one monotonic
//! clock. Hosts playing in real time use [`SystemClock`]; offline rendering
//! and tests drive a [`ManualClock`] by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait AudioClock: Send {
    /// Current time in seconds
    fn now(&self) -> f64;
}

/// Wall clock measured from construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock
///
/// Clones share the same time, so a host can keep a handle while the engine
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at `seconds`
    pub fn starting_at(seconds: f64) -> Self {
        let clock = Self::new();
        clock.set(seconds);
        clock
    }

    /// Move the clock forward; negative or NaN steps are ignored
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.set(self.now() + seconds);
        }
    }

    /// Advance by `frames` at `sample_rate`
    pub fn advance_frames(&self, frames: usize, sample_rate: u32) {
        if sample_rate > 0 {
            self.advance(frames as f64 / f64::from(sample_rate));
        }
    }

    /// Jump to `seconds`; the clock never moves backwards
    pub fn set(&self, seconds: f64) {
        if seconds.is_finite() && seconds >= self.now() {
            self.bits.store(seconds.to_bits(), Ordering::Release);
        }
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
