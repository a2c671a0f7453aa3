//! Engine Events
//!
//! Event-based communication for hosts that display playback state.
//! Events are queued as they happen and collected with
//! [`Engine::drain_events`](crate::Engine::drain_events):
//! - Status changes (idle/ready/playing/stopping)
//! - Section changes and queued transitions
//! - Every clip hand-off
//! - Post-reset readiness and errors

use crate::types::EngineState;
use serde::{Deserialize, Serialize};

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Engine status changed
    StatusChanged {
        /// The new state
        state: EngineState,
    },

    /// Current section changed
    SectionChanged {
        /// The new section
        section: String,
        /// The section that was playing before (if any)
        previous: Option<String>,
    },

    /// Queued section was set or cleared
    QueueChanged {
        /// The queued section, `None` when cleared or consumed
        queued: Option<String>,
        /// Whether the engine queued it on its own
        auto: bool,
    },

    /// Track is loaded and positioned at its entry section
    ///
    /// Emitted after `load_track` and after every stop/terminal reset.
    Ready {
        /// Track name
        track: String,
        /// Entry section
        section: String,
    },

    /// A clip became the current instance
    ClipStarted {
        /// Clip name
        clip: String,
        /// Section it plays in
        section: String,
    },

    /// Error occurred; the engine keeps running
    Error {
        /// Error message
        message: String,
    },
}

impl EngineEvent {
    /// Whether this event reports an error
    pub fn is_error(&self) -> bool {
        matches!(self, EngineEvent::Error { .. })
    }
}
