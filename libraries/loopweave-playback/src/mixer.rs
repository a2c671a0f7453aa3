//! Mixer: live clip instances and the three gain tiers
//!
//! Output gain for one instance is `clip gain × track volume × listener
//! volume`. Clip gain is automated per instance; the two volumes are steps.
//! Buffer positions are derived from the audio clock, so rendering in any
//! block size yields the same samples.

use crate::automation::GainParam;
use crate::volume::Volume;
use loopweave_core::{AudioBuffer, ClipTiming};
use std::sync::Arc;

/// Identifier of a playback instance
pub type InstanceId = u64;

/// Boundaries closer than this are pushed to the following cycle
pub const BOUNDARY_EPSILON: f64 = 0.001;

/// One scheduled, gain-controlled playback of a clip buffer
#[derive(Debug, Clone)]
pub struct PlaybackInstance {
    /// Instance id
    pub id: InstanceId,

    /// Clip name
    pub clip: String,

    /// Decoded audio
    pub buffer: Arc<AudioBuffer>,

    /// Clip gain automation
    pub gain: GainParam,

    /// Audio clock time the instance started
    pub started_at: f64,

    /// Buffer offset at `started_at`
    pub offset_at_start: f64,

    /// Resolved loop region and clip end
    pub timing: ClipTiming,

    /// Loops `loop_start..loop_point` natively
    pub looping: bool,
}

impl PlaybackInstance {
    /// Unwrapped position: `offset_at_start + (now - started_at)`
    pub fn position_at(&self, now: f64) -> f64 {
        self.offset_at_start + (now - self.started_at)
    }

    /// Position folded into the loop region once past the loop point
    ///
    /// Non-looping instances are returned unfolded.
    pub fn loop_position_at(&self, now: f64) -> f64 {
        let position = self.position_at(now);
        if !self.looping || position < self.timing.loop_point {
            return position;
        }
        let cycle = self.timing.cycle();
        let wrapped = self.timing.loop_start + (position - self.timing.loop_start).rem_euclid(cycle);
        // rem_euclid may round up to the full cycle
        if wrapped >= self.timing.loop_point {
            self.timing.loop_start
        } else {
            wrapped
        }
    }

    /// Buffer position to read at `now`, `None` when nothing should sound
    pub fn buffer_position_at(&self, now: f64) -> Option<f64> {
        if now < self.started_at {
            return None;
        }
        let position = self.loop_position_at(now);
        if !self.looping && position >= self.timing.clip_end {
            return None;
        }
        Some(position)
    }

    /// Audio clock time of the next loop boundary after `now`
    ///
    /// Before the loop point this is when the loop point is reached. Past it,
    /// a looping instance waits for the next wrap; a boundary less than
    /// [`BOUNDARY_EPSILON`] away is skipped so a timer firing early never
    /// decides twice for one pass. A non-looping instance past its loop point
    /// is due immediately.
    pub fn next_boundary(&self, now: f64) -> f64 {
        let position = self.position_at(now);
        let loop_point = self.timing.loop_point;

        if position < loop_point - BOUNDARY_EPSILON {
            return self.started_at + (loop_point - self.offset_at_start);
        }
        if !self.looping {
            return now;
        }

        let cycle = self.timing.cycle();
        let into_cycle = (position - self.timing.loop_start).rem_euclid(cycle);
        let mut remaining = cycle - into_cycle;
        if remaining < BOUNDARY_EPSILON {
            remaining += cycle;
        }
        now + remaining
    }

    /// Absolute time the audible tail after `boundary` ends
    pub fn clip_end_after(&self, boundary: f64) -> f64 {
        boundary + self.timing.tail()
    }
}

/// Live instances plus track and listener volume
#[derive(Debug)]
pub struct Mixer {
    instances: Vec<PlaybackInstance>,
    next_id: InstanceId,
    track_volume: Volume,
    listener_volume: Volume,
}

impl Mixer {
    /// Create a mixer with initial volumes
    pub fn new(track_volume: f32, listener_volume: f32) -> Self {
        Self {
            instances: Vec::new(),
            next_id: 1,
            track_volume: Volume::new(track_volume),
            listener_volume: Volume::new(listener_volume),
        }
    }

    /// Start an instance at `now` from `offset` into the buffer
    ///
    /// With a positive `fade_in` the clip gain ramps 0→1 over that many
    /// seconds, otherwise it starts at unity.
    pub fn start(
        &mut self,
        clip: &str,
        buffer: Arc<AudioBuffer>,
        timing: ClipTiming,
        looping: bool,
        now: f64,
        offset: f64,
        fade_in: f64,
    ) -> InstanceId {
        let id = self.next_id;
        self.next_id += 1;

        let mut gain = GainParam::new(0.0);
        if fade_in > 0.0 {
            gain.set_value_at_time(0.0, now);
            gain.linear_ramp_to_value_at_time(1.0, now + fade_in);
        } else {
            gain.set_value_at_time(1.0, now);
        }

        self.instances.push(PlaybackInstance {
            id,
            clip: clip.to_string(),
            buffer,
            gain,
            started_at: now,
            offset_at_start: offset,
            timing,
            looping,
        });
        id
    }

    /// Look up an instance
    pub fn instance(&self, id: InstanceId) -> Option<&PlaybackInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// Look up an instance mutably
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut PlaybackInstance> {
        self.instances.iter_mut().find(|i| i.id == id)
    }

    /// All live instances
    pub fn instances(&self) -> impl Iterator<Item = &PlaybackInstance> {
        self.instances.iter()
    }

    /// Step an instance's clip gain to zero at `at`
    pub fn silence_at(&mut self, id: InstanceId, at: f64) {
        if let Some(instance) = self.instance_mut(id) {
            instance.gain.fade_to(0.0, at, 0.0);
        }
    }

    /// Stop a looping instance from wrapping after the boundary at `boundary`
    ///
    /// The instance is rebased so it reads `loop_point` at `boundary` and
    /// runs on into its tail towards `clip_end`.
    pub fn end_loop(&mut self, id: InstanceId, boundary: f64) {
        if let Some(instance) = self.instance_mut(id) {
            if !instance.looping {
                return;
            }
            instance.looping = false;
            instance.started_at = boundary;
            instance.offset_at_start = instance.timing.loop_point;
        }
    }

    /// Ramp an instance's clip gain from its current value to zero
    pub fn fade_out(&mut self, id: InstanceId, from: f64, duration: f64) {
        if let Some(instance) = self.instance_mut(id) {
            instance.gain.fade_to(0.0, from, duration);
        }
    }

    /// Ramp every live instance to zero independently
    pub fn fade_out_all(&mut self, from: f64, duration: f64) {
        for instance in &mut self.instances {
            instance.gain.fade_to(0.0, from, duration);
        }
    }

    /// Release every instance
    pub fn clear(&mut self) -> usize {
        let count = self.instances.len();
        self.instances.clear();
        count
    }

    /// Drop instances that are permanently silent at `now`
    pub fn prune(&mut self, now: f64) -> Vec<InstanceId> {
        let mut removed = Vec::new();
        self.instances.retain(|instance| {
            let finished = !instance.looping && instance.position_at(now) >= instance.timing.clip_end;
            let keep = !finished && !instance.gain.is_silent_after(now);
            if !keep {
                removed.push(instance.id);
            }
            keep
        });
        if !removed.is_empty() {
            tracing::debug!(?removed, now, "Pruned silent instances");
        }
        removed
    }

    /// Mix every live instance into interleaved stereo `out`
    ///
    /// Frame `n` is sampled at `start_time + n / sample_rate`.
    pub fn render(&self, start_time: f64, sample_rate: u32, out: &mut [f32]) {
        out.fill(0.0);
        if sample_rate == 0 {
            return;
        }
        let master = self.master_gain();
        if master <= 0.0 || self.instances.is_empty() {
            return;
        }

        let rate = f64::from(sample_rate);
        for (frame_index, frame) in out.chunks_exact_mut(2).enumerate() {
            let t = start_time + frame_index as f64 / rate;
            let mut left = 0.0_f32;
            let mut right = 0.0_f32;

            for instance in &self.instances {
                let gain = instance.gain.value_at(t);
                if gain <= 0.0 {
                    continue;
                }
                if let Some(position) = instance.buffer_position_at(t) {
                    let (l, r) = instance.buffer.sample_at(position);
                    left += l * gain;
                    right += r * gain;
                }
            }

            frame[0] = left * master;
            frame[1] = right * master;
        }
    }

    /// Clip gain of an instance at `t`
    pub fn gain_at(&self, id: InstanceId, t: f64) -> Option<f32> {
        self.instance(id).map(|i| i.gain.value_at(t))
    }

    /// Track volume × listener volume
    pub fn master_gain(&self) -> f32 {
        self.track_volume.gain() * self.listener_volume.gain()
    }

    /// Set the track volume (linear 0-1)
    pub fn set_track_volume(&mut self, level: f32) {
        self.track_volume.set_level(level);
    }

    /// Track volume (linear 0-1)
    pub fn track_volume(&self) -> f32 {
        self.track_volume.level()
    }

    /// Set the listener volume (linear 0-1)
    pub fn set_listener_volume(&mut self, level: f32) {
        self.listener_volume.set_level(level);
    }

    /// Listener volume (linear 0-1)
    pub fn listener_volume(&self) -> f32 {
        self.listener_volume.level()
    }

    /// Mute or unmute locally, keeping the listener level
    pub fn set_listener_muted(&mut self, muted: bool) {
        self.listener_volume.set_muted(muted);
    }

    /// Listener mute state
    pub fn is_listener_muted(&self) -> bool {
        self.listener_volume.is_muted()
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// No live instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopweave_core::AudioFormat;

    const RATE: u32 = 100;

    fn timing(loop_start: f64, loop_point: f64, clip_end: f64) -> ClipTiming {
        ClipTiming {
            loop_start,
            loop_point,
            clip_end,
        }
    }

    /// Left channel holds the frame index, right channel its negation
    fn ramp_buffer(seconds: f64) -> Arc<AudioBuffer> {
        let frames = (seconds * f64::from(RATE)) as usize;
        let samples = (0..frames)
            .flat_map(|i| {
                let v = i as f32 / 1000.0;
                [v, -v]
            })
            .collect();
        Arc::new(AudioBuffer::new(samples, AudioFormat::stereo(RATE)))
    }

    fn constant_buffer(seconds: f64, value: f32) -> Arc<AudioBuffer> {
        let frames = (seconds * f64::from(RATE)) as usize;
        Arc::new(AudioBuffer::new(
            vec![value; frames * 2],
            AudioFormat::stereo(RATE),
        ))
    }

    #[test]
    fn boundary_before_loop_point() {
        let mut mixer = Mixer::default();
        let id = mixer.start("a", ramp_buffer(10.0), timing(0.0, 8.0, 10.0), true, 5.0, 0.0, 0.0);
        let instance = mixer.instance(id).unwrap();
        assert_eq!(instance.next_boundary(5.0), 13.0);
        assert_eq!(instance.next_boundary(9.0), 13.0);
    }

    #[test]
    fn boundary_wraps_for_looping_instance() {
        let mut mixer = Mixer::default();
        let id = mixer.start("a", ramp_buffer(10.0), timing(2.0, 6.0, 6.0), true, 0.0, 2.0, 0.0);
        let instance = mixer.instance(id).unwrap();

        // first boundary at t=4, then every 4s
        assert_eq!(instance.next_boundary(0.0), 4.0);
        assert!((instance.next_boundary(4.0) - 8.0).abs() < 1e-9);
        assert!((instance.next_boundary(5.0) - 8.0).abs() < 1e-9);
        // timer fired a hair early: still the boundary just passed, push to next
        assert!((instance.next_boundary(7.9995) - 12.0).abs() < 1e-3);
    }

    #[test]
    fn non_looping_past_loop_point_is_due_now() {
        let mut mixer = Mixer::default();
        let id = mixer.start("a", ramp_buffer(12.0), timing(0.0, 10.0, 12.0), false, 0.0, 0.0, 0.0);
        let instance = mixer.instance(id).unwrap();
        assert_eq!(instance.next_boundary(10.5), 10.5);
        assert_eq!(instance.clip_end_after(10.0), 12.0);
    }

    #[test]
    fn loop_position_wraps_into_region() {
        let mut mixer = Mixer::default();
        let id = mixer.start("a", ramp_buffer(10.0), timing(1.0, 3.0, 3.0), true, 0.0, 0.0, 0.0);
        let instance = mixer.instance(id).unwrap();
        assert_eq!(instance.loop_position_at(2.5), 2.5);
        assert!((instance.loop_position_at(3.5) - 1.5).abs() < 1e-9);
        assert!((instance.loop_position_at(5.5) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn ended_loop_runs_into_tail() {
        let mut mixer = Mixer::default();
        let id = mixer.start("a", ramp_buffer(6.0), timing(0.0, 4.0, 6.0), true, 0.0, 0.0, 0.0);

        // third wrap at t=12
        mixer.end_loop(id, 12.0);
        let instance = mixer.instance(id).unwrap();
        assert!(!instance.looping);
        assert!((instance.buffer_position_at(12.5).unwrap() - 4.5).abs() < 1e-9);
        assert!((instance.buffer_position_at(13.9).unwrap() - 5.9).abs() < 1e-9);
        assert_eq!(instance.buffer_position_at(14.0), None);

        assert!(mixer.prune(13.0).is_empty());
        assert_eq!(mixer.prune(14.0), vec![id]);
    }

    #[test]
    fn end_loop_leaves_one_shot_instances_alone() {
        let mut mixer = Mixer::default();
        let id = mixer.start("a", ramp_buffer(6.0), timing(0.0, 4.0, 6.0), false, 1.0, 0.0, 0.0);
        mixer.end_loop(id, 5.0);
        let instance = mixer.instance(id).unwrap();
        assert_eq!(instance.started_at, 1.0);
        assert_eq!(instance.offset_at_start, 0.0);
    }

    #[test]
    fn render_reads_clock_derived_positions() {
        let mut mixer = Mixer::default();
        mixer.start("a", ramp_buffer(2.0), timing(0.0, 2.0, 2.0), false, 1.0, 0.0, 0.0);

        let mut out = vec![0.0; 8];
        mixer.render(1.0, RATE, &mut out);
        let expected = [0.0, 0.0, 0.001, -0.001, 0.002, -0.002, 0.003, -0.003];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }

        // same frames rendered from a later block start
        let mut tail = vec![0.0; 4];
        mixer.render(1.02, RATE, &mut tail);
        for (got, want) in tail.iter().zip(&out[4..]) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn render_is_silent_before_start_and_after_clip_end() {
        let mut mixer = Mixer::default();
        mixer.start("a", constant_buffer(2.0, 0.5), timing(0.0, 1.0, 1.5), false, 1.0, 0.0, 0.0);

        let mut before = vec![1.0; 4];
        mixer.render(0.5, RATE, &mut before);
        assert!(before.iter().all(|s| *s == 0.0));

        let mut after = vec![1.0; 4];
        mixer.render(2.6, RATE, &mut after);
        assert!(after.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn gain_tiers_multiply() {
        let mut mixer = Mixer::new(0.5, 0.5);
        mixer.start("a", constant_buffer(2.0, 1.0), timing(0.0, 2.0, 2.0), true, 0.0, 0.0, 0.0);

        let mut out = vec![0.0; 2];
        mixer.render(0.5, RATE, &mut out);
        assert_eq!(out, vec![0.25, 0.25]);

        mixer.set_listener_muted(true);
        mixer.render(0.5, RATE, &mut out);
        assert_eq!(out, vec![0.0, 0.0]);
        assert_eq!(mixer.listener_volume(), 0.5);
    }

    #[test]
    fn fade_in_ramps_clip_gain() {
        let mut mixer = Mixer::default();
        let id = mixer.start("a", constant_buffer(2.0, 1.0), timing(0.0, 2.0, 2.0), true, 3.0, 0.0, 0.2);
        assert_eq!(mixer.gain_at(id, 3.0), Some(0.0));
        assert!((mixer.gain_at(id, 3.1).unwrap() - 0.5).abs() < 1e-5);
        assert_eq!(mixer.gain_at(id, 3.2), Some(1.0));
    }

    #[test]
    fn prune_drops_silent_and_finished_instances() {
        let mut mixer = Mixer::default();
        let faded = mixer.start("a", constant_buffer(4.0, 1.0), timing(0.0, 4.0, 4.0), true, 0.0, 0.0, 0.0);
        let finished = mixer.start("b", constant_buffer(2.0, 1.0), timing(0.0, 1.0, 2.0), false, 0.0, 0.0, 0.0);
        let alive = mixer.start("c", constant_buffer(4.0, 1.0), timing(0.0, 4.0, 4.0), true, 0.0, 0.0, 0.0);

        mixer.fade_out(faded, 1.0, 1.0);
        assert!(mixer.prune(1.5).is_empty());

        let mut removed = mixer.prune(2.5);
        removed.sort_unstable();
        assert_eq!(removed, vec![faded, finished]);
        assert!(mixer.instance(alive).is_some());
        assert_eq!(mixer.len(), 1);
    }
}
