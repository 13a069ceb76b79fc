//! Scheduler - deferred tasks on a virtual timeline
//!
//! Single-threaded and cooperative: nothing runs until the driver pops it.
//! Guarantees:
//! - a task never fires before its scheduled time
//! - tasks due at the same instant fire in scheduling order (FIFO)
//! - `now` never moves backwards

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use raiz_core::SimTime;

struct Scheduled<T> {
    at: SimTime,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// Priority queue of deferred tasks
pub struct Scheduler<T> {
    now: SimTime,
    queue: BinaryHeap<Reverse<Scheduled<T>>>,
    next_seq: u64,
}

impl<T> Scheduler<T> {
    /// Create a scheduler at the start of the timeline
    pub fn new() -> Self {
        Self::starting_at(SimTime::ZERO)
    }

    pub fn starting_at(now: SimTime) -> Self {
        Scheduler {
            now,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Current position on the timeline
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `task` at `at`. Times in the past are clamped to `now`.
    pub fn schedule_at(&mut self, at: SimTime, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled {
            at: at.max(self.now),
            seq,
            task,
        }));
    }

    /// Schedule `task` after `delay` from now
    pub fn schedule_after(&mut self, delay: Duration, task: T) {
        self.schedule_at(self.now + delay, task);
    }

    /// Fire time of the earliest pending task
    pub fn next_deadline(&self) -> Option<SimTime> {
        self.queue.peek().map(|Reverse(s)| s.at)
    }

    /// Pop the earliest task if it is due at or before `until`, advancing
    /// `now` to its fire time.
    pub fn pop_due(&mut self, until: SimTime) -> Option<(SimTime, T)> {
        if self.next_deadline()? > until {
            return None;
        }
        let Reverse(scheduled) = self.queue.pop()?;
        self.now = self.now.max(scheduled.at);
        Some((scheduled.at, scheduled.task))
    }

    /// Move `now` forward to `t` (never backwards)
    pub fn advance_to(&mut self, t: SimTime) {
        self.now = self.now.max(t);
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fires_in_time_order() {
        let mut s = Scheduler::new();
        s.schedule_after(Duration::from_secs(3), "c");
        s.schedule_after(Duration::from_secs(1), "a");
        s.schedule_after(Duration::from_secs(2), "b");

        let fired: Vec<_> = std::iter::from_fn(|| s.pop_due(SimTime::MAX))
            .map(|(_, t)| t)
            .collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert_eq!(s.now(), SimTime::from_secs(3));
    }

    #[test]
    fn test_same_instant_is_fifo() {
        let mut s = Scheduler::new();
        for i in 0..10 {
            s.schedule_at(SimTime::from_secs(1), i);
        }
        let fired: Vec<_> = std::iter::from_fn(|| s.pop_due(SimTime::from_secs(1)))
            .map(|(_, t)| t)
            .collect();
        assert_eq!(fired, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_not_due_yet() {
        let mut s = Scheduler::new();
        s.schedule_after(Duration::from_secs(2), ());

        assert!(s.pop_due(SimTime::from_millis(1_999)).is_none());
        assert_eq!(s.now(), SimTime::ZERO);
        assert_eq!(s.len(), 1);

        let (at, ()) = s.pop_due(SimTime::from_secs(2)).unwrap();
        assert_eq!(at, SimTime::from_secs(2));
        assert!(s.is_empty());
    }

    #[test]
    fn test_past_deadline_is_clamped_to_now() {
        let mut s = Scheduler::new();
        s.advance_to(SimTime::from_secs(5));
        s.schedule_at(SimTime::from_secs(1), ());
        assert_eq!(s.next_deadline(), Some(SimTime::from_secs(5)));
    }

    #[test]
    fn test_advance_never_rewinds() {
        let mut s: Scheduler<()> = Scheduler::starting_at(SimTime::from_secs(10));
        s.advance_to(SimTime::from_secs(3));
        assert_eq!(s.now(), SimTime::from_secs(10));
    }

    proptest! {
        #[test]
        fn prop_pop_order_is_sorted(delays in prop::collection::vec(0u64..10_000, 1..200)) {
            let mut s = Scheduler::new();
            for (i, d) in delays.iter().enumerate() {
                s.schedule_after(Duration::from_millis(*d), i);
            }
            let mut last: Option<(SimTime, usize)> = None;
            while let Some((at, i)) = s.pop_due(SimTime::MAX) {
                prop_assert_eq!(at, SimTime::from_millis(delays[i]));
                prop_assert_eq!(s.now(), at);
                if let Some((prev_at, prev_i)) = last {
                    prop_assert!(prev_at < at || (prev_at == at && prev_i < i));
                }
                last = Some((at, i));
            }
        }
    }
}
