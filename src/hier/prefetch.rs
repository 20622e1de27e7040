use smallvec::SmallVec;

use super::address::LineId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
}

#[derive(Debug, Clone, Copy)]
pub struct PrefetchConfig {
    pub issue_width: usize,
    pub look_ahead: u64,
}

/// Next-line stream detector.
///
/// Every demand read compares its line with the previous demand read; a stride of exactly one
/// line enters `Streaming`, anything else drops back to `Idle`. While streaming, the lines
/// following the last demand read are offered for prefetch, nearest first.
#[derive(Debug, Clone)]
pub struct StreamPrefetcher {
    config: PrefetchConfig,
    state: StreamState,
    last_demand_line: Option<LineId>,
}

impl StreamPrefetcher {
    pub fn new(config: PrefetchConfig) -> Self {
        Self {
            config,
            state: StreamState::Idle,
            last_demand_line: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == StreamState::Streaming
    }

    pub fn last_demand_line(&self) -> Option<LineId> {
        self.last_demand_line
    }

    /// Observe a demand read of `line`. Writes and prefetches never reach this.
    pub fn on_demand_read(&mut self, line: LineId) {
        let sequential = self
            .last_demand_line
            .and_then(|last| last.checked_add(1))
            .map_or(false, |next| next == line);
        self.state = if sequential {
            StreamState::Streaming
        } else {
            StreamState::Idle
        };
        self.last_demand_line = Some(line);
    }

    /// Lines to prefetch this cycle. `skip` reports lines that are already resident or in flight.
    pub fn candidates<F>(&self, mut skip: F) -> SmallVec<[LineId; 8]>
    where
        F: FnMut(LineId) -> bool,
    {
        let mut picked = SmallVec::new();
        let (StreamState::Streaming, Some(base)) = (self.state, self.last_demand_line) else {
            return picked;
        };
        if self.config.issue_width == 0 {
            return picked;
        }
        for offset in 1..=self.config.look_ahead {
            let Some(line) = base.checked_add(offset) else {
                break;
            };
            if skip(line) {
                continue;
            }
            picked.push(line);
            if picked.len() >= self.config.issue_width {
                break;
            }
        }
        picked
    }
}
