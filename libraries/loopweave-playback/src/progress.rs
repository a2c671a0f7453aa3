//! Progress reporting derived from the current instance

use crate::mixer::PlaybackInstance;
use crate::types::PlaybackInfo;

/// Snapshot of `instance` at `now` for display
///
/// `progress` is `position / loop_point` clamped to [0, 1]; it is
/// monotone while one instance plays and restarts with every hand-off.
/// A steady loop holds `progress` at 1 after its first cycle; hosts that
/// show a moving bar for steady loops should read `loop_position`.
pub fn report(instance: &PlaybackInstance, section: &str, now: f64) -> PlaybackInfo {
    let position = instance.position_at(now);
    let loop_point = instance.timing.loop_point;
    let progress = if loop_point > 0.0 {
        (position / loop_point).clamp(0.0, 1.0)
    } else {
        0.0
    };

    PlaybackInfo {
        clip: instance.clip.clone(),
        section: section.to_string(),
        position,
        loop_point,
        progress,
        loop_position: instance.loop_position_at(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::Mixer;
    use loopweave_core::{AudioBuffer, AudioFormat, ClipTiming};
    use std::sync::Arc;

    #[test]
    fn progress_is_position_over_loop_point() {
        let mut mixer = Mixer::default();
        let buffer = Arc::new(AudioBuffer::silent(10.0, AudioFormat::stereo(100)));
        let timing = ClipTiming {
            loop_start: 2.0,
            loop_point: 8.0,
            clip_end: 8.0,
        };
        let id = mixer.start("Loop", buffer, timing, true, 1.0, 0.0, 0.0);
        let instance = mixer.instance(id).unwrap();

        let info = report(instance, "Explore", 3.0);
        assert_eq!(info.clip, "Loop");
        assert_eq!(info.section, "Explore");
        assert_eq!(info.position, 2.0);
        assert_eq!(info.progress, 0.25);

        // past the loop point: progress holds at 1, loop position wraps
        let info = report(instance, "Explore", 11.0);
        assert_eq!(info.progress, 1.0);
        assert_eq!(info.position, 10.0);
        assert_eq!(info.loop_position, 4.0);
    }
}
