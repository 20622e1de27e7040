/*
Time-queue for the hierarchy model.

Every tier is split into banks, and each bank can only serve one request at a time. A bank keeps
a single busy-until cycle; a request issued to a bank starts once both the issuing cycle and the
bank are free, and completes a fixed base latency later.

A request that finds its bank still busy additionally pays a one-time conflict penalty. The
penalty is charged once per conflicting request, not per cycle of waiting.

Accepted requests yield a `Ticket` describing when the service will complete.
*/

use serde::Serialize;

pub type Cycle = u64;

// Result of scheduling a request on a bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    issued_at: Cycle,
    ready_at: Cycle,
    conflicted: bool,
}

impl Ticket {
    // Cycle at which the bank will make the line available.
    pub fn ready_at(&self) -> Cycle {
        self.ready_at
    }

    // Whether the bank was still occupied when the request arrived.
    pub fn conflicted(&self) -> bool {
        self.conflicted
    }

    // Cycles between issue and completion.
    pub fn latency(&self) -> Cycle {
        self.ready_at.saturating_sub(self.issued_at)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BankStats {
    requests: u64,
    conflicts: u64,
}

impl BankStats {
    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    fn record(&mut self, conflicted: bool) {
        self.requests = self.requests.saturating_add(1);
        if conflicted {
            self.conflicts = self.conflicts.saturating_add(1);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BankConfig {
    pub num_banks: usize,
    // Fixed latency added to every request
    pub base_latency: Cycle,
    // One-time delay charged to a request that found its bank busy
    pub conflict_penalty: Cycle,
}

// Busy-until tracking for every bank of one tier.
#[derive(Debug, Clone)]
pub struct BankTimingModel {
    config: BankConfig,
    busy_until: Vec<Cycle>,
    stats: BankStats,
}

impl BankTimingModel {
    pub fn new(config: BankConfig) -> Self {
        assert!(config.num_banks > 0, "num_banks must be > 0");
        Self {
            config,
            busy_until: vec![0; config.num_banks],
            stats: BankStats::default(),
        }
    }

    pub fn num_banks(&self) -> usize {
        self.config.num_banks
    }

    pub fn stats(&self) -> BankStats {
        self.stats
    }

    #[cfg(test)]
    pub(crate) fn busy_until(&self, bank: usize) -> Cycle {
        self.busy_until[bank]
    }

    // Schedule a request on `bank` at `now` using this tier's latency and penalty.
    pub fn schedule(&mut self, bank: usize, now: Cycle) -> Ticket {
        let BankConfig {
            base_latency,
            conflict_penalty,
            ..
        } = self.config;
        self.schedule_with(bank, now, base_latency, conflict_penalty)
    }

    // The penalty condition compares against the no-conflict completion time, so it also fires
    // when the bank is occupied by a single long request for a different line.
    pub fn schedule_with(
        &mut self,
        bank: usize,
        now: Cycle,
        base_latency: Cycle,
        conflict_penalty: Cycle,
    ) -> Ticket {
        let start = now.max(self.busy_until[bank]);
        let mut completion = start.saturating_add(base_latency);
        let conflicted = completion > now.saturating_add(base_latency);
        if conflicted {
            completion = completion.saturating_add(conflict_penalty);
        }
        debug_assert!(completion >= self.busy_until[bank]);
        self.busy_until[bank] = completion;
        self.stats.record(conflicted);

        Ticket {
            issued_at: now,
            ready_at: completion,
            conflicted,
        }
    }
}
