use std::num::NonZeroUsize;

use lru::LruCache;

use super::address::LineId;

/// Fully-associative, LRU-ordered line store for the fast tier.
#[derive(Debug)]
pub struct TierCache {
    lines: LruCache<LineId, ()>,
}

impl TierCache {
    pub fn new(capacity_lines: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity_lines).expect("capacity_lines must be > 0");
        Self {
            lines: LruCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lines.cap().get()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    // Does not change recency.
    pub fn contains(&self, line: LineId) -> bool {
        self.lines.contains(&line)
    }

    /// Move a resident line to the most-recently-used position.
    ///
    /// Panics if the line is absent; callers check `contains` first.
    pub fn touch(&mut self, line: LineId) {
        assert!(
            self.lines.get(&line).is_some(),
            "touch on non-resident line {:#x}",
            line
        );
    }

    /// Install `line` as most-recently-used, evicting the least-recently-used line when full.
    /// Returns the evicted line, if any.
    pub fn insert(&mut self, line: LineId) -> Option<LineId> {
        if self.lines.get(&line).is_some() {
            return None;
        }
        let evicted = self.lines.push(line, ()).map(|(victim, _)| victim);
        debug_assert!(self.lines.len() <= self.capacity());
        evicted
    }

    // Least-recently-used line, i.e. the next eviction victim.
    #[cfg(test)]
    pub(crate) fn lru_line(&self) -> Option<LineId> {
        self.lines.peek_lru().map(|(line, _)| *line)
    }
}
