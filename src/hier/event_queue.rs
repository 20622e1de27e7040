use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use smallvec::SmallVec;

use super::address::LineId;
use crate::timeq::Cycle;

/// A slow-tier fill that has become visible to the fast tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub line: LineId,
    pub arrival_at: Cycle,
    pub is_prefetch: bool,
}

#[derive(Debug, Clone, Copy)]
struct InflightEntry {
    arrival_at: Cycle,
    is_prefetch: bool,
}

/// Outstanding slow-tier fills, at most one per line.
///
/// The heap orders events by `(arrival_at, issue sequence)`; the in-flight map is the single
/// source of truth for whether a line is pending and whether it still counts as a prefetch.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<(Cycle, u64, LineId)>>,
    inflight: HashMap<LineId, InflightEntry>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }

    pub fn is_in_flight(&self, line: LineId) -> bool {
        self.inflight.contains_key(&line)
    }

    #[cfg(test)]
    pub(crate) fn arrival_of(&self, line: LineId) -> Option<Cycle> {
        self.inflight.get(&line).map(|entry| entry.arrival_at)
    }

    /// Register a fill of `line` arriving at `arrival_at`. Returns `false` and does nothing if
    /// the line is already in flight.
    pub fn schedule(&mut self, line: LineId, arrival_at: Cycle, is_prefetch: bool) -> bool {
        if self.is_in_flight(line) {
            return false;
        }
        self.inflight.insert(
            line,
            InflightEntry {
                arrival_at,
                is_prefetch,
            },
        );
        self.heap.push(Reverse((arrival_at, self.next_seq, line)));
        self.next_seq += 1;
        debug_assert_eq!(self.heap.len(), self.inflight.len());
        true
    }

    /// A demand read merged into an in-flight prefetch of the same line. Returns `false` if the
    /// line is not in flight.
    pub fn promote_to_demand(&mut self, line: LineId) -> bool {
        match self.inflight.get_mut(&line) {
            Some(entry) => {
                entry.is_prefetch = false;
                true
            }
            None => false,
        }
    }

    /// Remove every fill that has arrived by `now`.
    ///
    /// Prefetch fills come first and demand fills last, each group in `(arrival, issue)` order,
    /// so a demand line is the most recently installed line after the drain.
    pub fn drain(&mut self, now: Cycle) -> SmallVec<[Arrival; 4]> {
        let mut prefetches: SmallVec<[Arrival; 4]> = SmallVec::new();
        let mut demands: SmallVec<[Arrival; 1]> = SmallVec::new();
        while let Some(&Reverse((arrival_at, _, line))) = self.heap.peek() {
            if arrival_at > now {
                break;
            }
            self.heap.pop();
            let entry = self
                .inflight
                .remove(&line)
                .expect("queued event without in-flight entry");
            let arrival = Arrival {
                line,
                arrival_at,
                is_prefetch: entry.is_prefetch,
            };
            if entry.is_prefetch {
                prefetches.push(arrival);
            } else {
                demands.push(arrival);
            }
        }
        prefetches.extend(demands);
        prefetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_queue_is_empty() {
        let queue = EventQueue::new();
        assert!(queue.is_empty());
        assert!(!queue.is_in_flight(0));
        assert_eq!(queue.arrival_of(0), None);
    }

    #[test]
    fn duplicate_line_is_rejected() {
        let mut queue = EventQueue::new();
        assert!(queue.schedule(7, 10, true));
        assert!(!queue.schedule(7, 4, false));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.arrival_of(7), Some(10));
    }

    #[test]
    fn drain_only_releases_arrived_events() {
        let mut queue = EventQueue::new();
        queue.schedule(1, 3, false);
        queue.schedule(2, 5, true);
        assert!(queue.drain(2).is_empty());
        let arrived = queue.drain(4);
        assert_eq!(arrived.len(), 1);
        assert_eq!(arrived[0].line, 1);
        assert!(!queue.is_in_flight(1));
        assert!(queue.is_in_flight(2));
        let arrived = queue.drain(100);
        assert_eq!(arrived[0].line, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn same_cycle_arrivals_are_stable() {
        let mut queue = EventQueue::new();
        for line in [9, 4, 6] {
            queue.schedule(line, 8, true);
        }
        queue.schedule(1, 7, true);
        let lines: Vec<_> = queue.drain(8).iter().map(|a| a.line).collect();
        assert_eq!(lines, vec![1, 9, 4, 6]);
    }

    #[test]
    fn demand_fills_drain_after_prefetches() {
        let mut queue = EventQueue::new();
        queue.schedule(3, 5, false);
        queue.schedule(4, 5, true);
        queue.schedule(5, 6, true);
        let arrived = queue.drain(6);
        let lines: Vec<_> = arrived.iter().map(|a| a.line).collect();
        assert_eq!(lines, vec![4, 5, 3]);
        assert!(!arrived[2].is_prefetch);
    }

    #[test]
    fn promoted_prefetch_drains_as_demand() {
        let mut queue = EventQueue::new();
        queue.schedule(2, 4, true);
        queue.schedule(3, 4, true);
        assert!(queue.promote_to_demand(2));
        assert!(!queue.promote_to_demand(99));
        let arrived = queue.drain(4);
        assert_eq!(arrived[0].line, 3);
        assert_eq!(arrived[1].line, 2);
        assert!(!arrived[1].is_prefetch);
    }

    #[test]
    fn line_can_be_rescheduled_after_drain() {
        let mut queue = EventQueue::new();
        for round in 0..50 {
            let now = round * 10;
            assert!(queue.schedule(1, now + 3, false), "round {round}");
            assert!(queue.drain(now + 3).len() == 1, "round {round}");
        }
        assert!(queue.is_empty());
    }
}
