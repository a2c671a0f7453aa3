//! Core types for the playback engine

use serde::{Deserialize, Serialize};

/// Longest stop fade accepted by the engine (seconds)
pub const MAX_FADE_OUT_SECONDS: f64 = 30.0;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No track loaded
    Idle,

    /// Track loaded, nothing audible
    Ready,

    /// A section is playing
    Playing,

    /// Stop fade in progress
    Stopping,
}

impl EngineState {
    /// Human readable status text
    pub fn label(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Ready => "ready",
            EngineState::Playing => "playing",
            EngineState::Stopping => "stopping",
        }
    }
}

/// Configuration for the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stop fade duration in seconds (0-30, default: 6)
    pub fade_out_seconds: f64,

    /// Fade-in applied to the incoming clip of a hand-off (default: 0.2)
    pub hand_off_fade_seconds: f64,

    /// Delay after a terminal clip's end before the track resets (default: 0.05)
    pub reset_delay_seconds: f64,

    /// Initial track volume (linear 0-1, default: 1)
    pub track_volume: f32,

    /// Initial listener volume (linear 0-1, default: 1)
    pub listener_volume: f32,

    /// Source mode to decode (default: base)
    pub source_mode: Option<String>,

    /// Successor picker seed; random when absent
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_out_seconds: 6.0,
            hand_off_fade_seconds: 0.2,
            reset_delay_seconds: 0.05,
            track_volume: 1.0,
            listener_volume: 1.0,
            source_mode: None,
            seed: None,
        }
    }
}

/// Snapshot of what is audible right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackInfo {
    /// Clip of the current instance
    pub clip: String,

    /// Current section
    pub section: String,

    /// Seconds into the clip buffer, unwrapped
    pub position: f64,

    /// Loop point of the clip
    pub loop_point: f64,

    /// `position / loop_point`, clamped to [0, 1]; stays at 1 once a steady loop wraps
    pub progress: f64,

    /// Position folded into the loop region for steady loops
    pub loop_position: f64,
}

/// A section the listener may transition to from the current one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionChoice {
    /// Section name
    pub name: String,

    /// Display name, falling back to the section name
    pub display_name: String,

    /// Currently queued
    pub queued: bool,

    /// Auto-queued and cannot be changed
    pub locked: bool,
}
