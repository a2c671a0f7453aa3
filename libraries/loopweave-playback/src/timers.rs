//! Software timers on the audio clock
//!
//! The engine never sleeps: it records deadlines here and fires the due ones
//! whenever the host calls `tick`.

use crate::mixer::InstanceId;

/// Identifier of a scheduled timer
pub type TimerId = u64;

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Next-clip decision for an instance reaching its loop point
    LoopBoundary {
        /// Instance whose boundary this is
        instance: InstanceId,
    },

    /// Automatic reset after a terminal clip played out
    Reset,

    /// Stop fade finished
    FadeComplete,
}

/// A timer that has come due
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueTimer {
    /// Timer id
    pub id: TimerId,
    /// When it was meant to fire
    pub deadline: f64,
    /// What it does
    pub kind: TimerKind,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    deadline: f64,
    kind: TimerKind,
}

/// Pending timers ordered by deadline
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_id: TimerId,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer at `deadline` (audio clock seconds)
    pub fn schedule(&mut self, deadline: f64, kind: TimerKind) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        tracing::debug!(id, deadline, ?kind, "Timer armed");
        self.timers.push(Timer { id, deadline, kind });
        id
    }

    /// Cancel one timer; returns whether it was pending
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Cancel every loop-boundary timer
    pub fn cancel_loop_boundaries(&mut self) -> usize {
        self.cancel_where(|kind| matches!(kind, TimerKind::LoopBoundary { .. }))
    }

    /// Cancel every timer of `kind`
    pub fn cancel_kind(&mut self, kind: TimerKind) -> usize {
        self.cancel_where(|k| *k == kind)
    }

    /// Cancel every pending timer
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    fn cancel_where(&mut self, predicate: impl Fn(&TimerKind) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| !predicate(&t.kind));
        before - self.timers.len()
    }

    /// Remove and return the earliest timer due at `now`
    ///
    /// Ties on deadline fire in scheduling order.
    pub fn pop_due(&mut self, now: f64) -> Option<DueTimer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by(|(_, a), (_, b)| {
                a.deadline
                    .total_cmp(&b.deadline)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|(i, _)| i)?;
        let timer = self.timers.swap_remove(index);
        Some(DueTimer {
            id: timer.id,
            deadline: timer.deadline,
            kind: timer.kind,
        })
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers
            .iter()
            .map(|t| t.deadline)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Deadline of the pending timer of `kind`, if any
    pub fn deadline_of(&self, kind: TimerKind) -> Option<f64> {
        self.timers
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.deadline)
    }

    /// Number of pending loop-boundary timers
    pub fn loop_boundary_count(&self) -> usize {
        self.timers
            .iter()
            .filter(|t| matches!(t.kind, TimerKind::LoopBoundary { .. }))
            .count()
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// No timers pending
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(3.0, TimerKind::Reset);
        timers.schedule(1.0, TimerKind::LoopBoundary { instance: 7 });
        timers.schedule(2.0, TimerKind::FadeComplete);

        assert_eq!(timers.pop_due(0.5), None);
        let due = timers.pop_due(5.0).unwrap();
        assert_eq!(due.kind, TimerKind::LoopBoundary { instance: 7 });
        assert_eq!(due.deadline, 1.0);
        assert_eq!(timers.pop_due(5.0).map(|t| t.kind), Some(TimerKind::FadeComplete));
        assert_eq!(timers.pop_due(5.0).map(|t| t.kind), Some(TimerKind::Reset));
        assert!(timers.is_empty());
    }

    #[test]
    fn equal_deadlines_fire_in_scheduling_order() {
        let mut timers = TimerQueue::new();
        let first = timers.schedule(1.0, TimerKind::Reset);
        let second = timers.schedule(1.0, TimerKind::FadeComplete);
        assert_eq!(timers.pop_due(1.0).map(|t| t.id), Some(first));
        assert_eq!(timers.pop_due(1.0).map(|t| t.id), Some(second));
    }

    #[test]
    fn cancel_loop_boundaries_keeps_other_timers() {
        let mut timers = TimerQueue::new();
        timers.schedule(1.0, TimerKind::LoopBoundary { instance: 1 });
        timers.schedule(2.0, TimerKind::LoopBoundary { instance: 2 });
        timers.schedule(3.0, TimerKind::Reset);

        assert_eq!(timers.cancel_loop_boundaries(), 2);
        assert_eq!(timers.loop_boundary_count(), 0);
        assert_eq!(timers.next_deadline(), Some(3.0));
        assert_eq!(timers.deadline_of(TimerKind::Reset), Some(3.0));
    }

    #[test]
    fn cancel_by_id_and_kind() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(1.0, TimerKind::Reset);
        timers.schedule(2.0, TimerKind::FadeComplete);

        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert_eq!(timers.cancel_kind(TimerKind::FadeComplete), 1);
        assert_eq!(timers.cancel_all(), 0);
    }
}
