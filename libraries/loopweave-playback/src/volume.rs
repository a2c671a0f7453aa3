//! Volume tiers applied on top of clip gain
//!
//! Track and listener volume are linear gains in 0.0-1.0 applied as a step.
//! Only clip gain is ever ramped.

/// Linear volume with a local mute
///
/// Mute preserves the level so unmuting restores it.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Volume level (0.0-1.0)
    level: f32,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume, clamping `level` into 0.0-1.0
    pub fn new(level: f32) -> Self {
        Self {
            level: Self::clamp(level),
            muted: false,
        }
    }

    /// Set volume level (0.0-1.0)
    pub fn set_level(&mut self, level: f32) {
        self.level = Self::clamp(level);
    }

    /// Get current volume level (0.0-1.0)
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Mute audio (preserves volume level)
    pub fn mute(&mut self) {
        self.muted = true;
    }

    /// Unmute audio (restores previous volume)
    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Set mute state
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain multiplier; 0.0 if muted
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }

    fn clamp(level: f32) -> f32 {
        if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}
