use log::{debug, info};

use super::address::{bank_of_line, AddressMapper, LineId};
use super::cache::TierCache;
use super::event_queue::EventQueue;
use super::prefetch::{PrefetchConfig, StreamPrefetcher};
use super::stats::SimulationMetrics;
use crate::sim::config::HierarchyConfig;
use crate::sim::error::{SimError, TraceError};
use crate::sim::trace::{MemOp, OpKind};
use crate::timeq::{BankConfig, BankTimingModel, Cycle};

/// Whether the compute unit is blocked on a fast-tier miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemandState {
    #[default]
    Idle,
    AwaitingFill { line: LineId, issue_cycle: Cycle },
}

/// Cycle-stepped model of the two-tier hierarchy.
///
/// Each cycle runs the same fixed sequence: drain slow-tier arrivals, complete the pending demand
/// read, admit the next trace operation, issue prefetches, advance the clock. Reordering these
/// steps changes results.
#[derive(Debug)]
pub struct SimulationEngine {
    config: HierarchyConfig,
    mapper: AddressMapper,
    fast_tier: TierCache,
    fast_banks: BankTimingModel,
    slow_banks: BankTimingModel,
    events: EventQueue,
    prefetcher: StreamPrefetcher,
    demand: DemandState,
    cycle: Cycle,
    metrics: SimulationMetrics,
}

impl SimulationEngine {
    pub fn new(config: HierarchyConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            mapper: AddressMapper::new(config.line_bytes),
            fast_tier: TierCache::new(config.fast_tier_lines()),
            // no conflict penalty on the fast tier, only queuing
            fast_banks: BankTimingModel::new(BankConfig {
                num_banks: config.fast_tier_banks,
                base_latency: config.fast_latency,
                conflict_penalty: 0,
            }),
            slow_banks: BankTimingModel::new(BankConfig {
                num_banks: config.slow_tier_banks,
                base_latency: config.slow_latency,
                conflict_penalty: config.conflict_penalty,
            }),
            events: EventQueue::new(),
            prefetcher: StreamPrefetcher::new(PrefetchConfig {
                issue_width: config.prefetch_issue_width,
                look_ahead: config.prefetch_look_ahead,
            }),
            demand: DemandState::Idle,
            cycle: 0,
            metrics: SimulationMetrics::default(),
        })
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn demand_state(&self) -> DemandState {
        self.demand
    }

    pub fn fast_tier(&self) -> &TierCache {
        &self.fast_tier
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn prefetcher(&self) -> &StreamPrefetcher {
        &self.prefetcher
    }

    /// Snapshot of the counters so far.
    pub fn metrics(&self) -> SimulationMetrics {
        let mut metrics = self.metrics.clone();
        metrics.set_cycles(self.cycle);
        metrics.set_bank_stats(self.fast_banks.stats(), self.slow_banks.stats());
        metrics
    }

    /// No demand read is pending and no fill is outstanding.
    pub fn is_quiescent(&self) -> bool {
        self.demand == DemandState::Idle && self.events.is_empty()
    }

    /// Run one cycle. `next_op` is consulted only when the engine can admit an operation, and
    /// returns `None` once the trace is exhausted. Returns whether an operation was admitted.
    pub fn step<F>(&mut self, mut next_op: F) -> Result<bool, TraceError>
    where
        F: FnMut() -> Option<Result<MemOp, TraceError>>,
    {
        self.drain_arrivals();
        self.complete_pending_read();

        let mut admitted = false;
        let mut trace_open = true;
        if self.demand == DemandState::Idle {
            match next_op() {
                Some(op) => {
                    self.admit(op?);
                    admitted = true;
                }
                None => trace_open = false,
            }
        }

        // after the trace ends nothing consumes prefetched lines
        let demand_work = trace_open || self.demand != DemandState::Idle;
        if demand_work && self.prefetcher.is_streaming() {
            self.issue_prefetches();
        }

        self.cycle += 1;
        Ok(admitted)
    }

    /// Run a trace to completion.
    pub fn run<I>(&mut self, ops: I) -> SimulationMetrics
    where
        I: IntoIterator<Item = MemOp>,
    {
        match self.drive(ops.into_iter().map(Ok)) {
            Ok(()) => self.finish(),
            Err(err) => unreachable!("infallible trace failed: {err}"),
        }
    }

    /// Run a fallible trace to completion, aborting at the first malformed entry.
    pub fn try_run<I>(&mut self, ops: I) -> Result<SimulationMetrics, SimError>
    where
        I: IntoIterator<Item = Result<MemOp, TraceError>>,
    {
        self.drive(ops)?;
        Ok(self.finish())
    }

    fn drive<I>(&mut self, ops: I) -> Result<(), TraceError>
    where
        I: IntoIterator<Item = Result<MemOp, TraceError>>,
    {
        let mut ops = ops.into_iter().peekable();
        while ops.peek().is_some() || !self.is_quiescent() {
            self.step(|| ops.next())?;
        }
        Ok(())
    }

    fn finish(&self) -> SimulationMetrics {
        let metrics = self.metrics();
        info!(
            "run finished at cycle {}: {} hits, {} misses, {} prefetches",
            metrics.cycles(),
            metrics.hits(),
            metrics.misses(),
            metrics.prefetch_issues()
        );
        metrics
    }

    fn drain_arrivals(&mut self) {
        for arrival in self.events.drain(self.cycle) {
            let evicted = self.fast_tier.insert(arrival.line);
            debug!(
                "cycle {}: fill line {:#x} (prefetch={}) evicted {:?}",
                self.cycle, arrival.line, arrival.is_prefetch, evicted
            );
        }
    }

    fn complete_pending_read(&mut self) {
        let DemandState::AwaitingFill { line, issue_cycle } = self.demand else {
            return;
        };
        if !self.fast_tier.contains(line) {
            assert!(
                self.events.is_in_flight(line),
                "pending read of line {:#x} has no fill in flight",
                line
            );
            return;
        }
        let bank = bank_of_line(line, self.fast_banks.num_banks());
        let ticket = self.fast_banks.schedule(bank, self.cycle);
        let latency = ticket.ready_at() - issue_cycle;
        self.metrics.record_fill_latency(latency);
        self.fast_tier.touch(line);
        self.demand = DemandState::Idle;
        debug!(
            "cycle {}: pending read of line {:#x} done, latency {}",
            self.cycle, line, latency
        );
    }

    fn admit(&mut self, op: MemOp) {
        let line = self.mapper.line_id(op.addr);
        match op.kind {
            OpKind::Read => {
                if self.fast_tier.contains(line) {
                    let bank = bank_of_line(line, self.fast_banks.num_banks());
                    let ticket = self.fast_banks.schedule(bank, self.cycle);
                    self.fast_tier.touch(line);
                    self.metrics.record_hit(ticket.latency());
                    debug!("cycle {}: {} hit", self.cycle, op);
                } else {
                    self.metrics.record_miss();
                    self.fetch_demand(line);
                    debug!("cycle {}: {} miss", self.cycle, op);
                }
                self.prefetcher.on_demand_read(line);
            }
            OpKind::Write => {
                self.fast_tier.insert(line);
                debug!("cycle {}: {} allocated", self.cycle, op);
            }
        }
    }

    fn fetch_demand(&mut self, line: LineId) {
        assert_eq!(
            self.demand,
            DemandState::Idle,
            "second demand read admitted while one is pending"
        );
        self.demand = DemandState::AwaitingFill {
            line,
            issue_cycle: self.cycle,
        };
        // every miss occupies a slow bank, even one that rides an in-flight prefetch
        let bank = bank_of_line(line, self.slow_banks.num_banks());
        let ticket = self.slow_banks.schedule(bank, self.cycle);
        self.metrics.record_demand_fetch();
        if self.events.schedule(line, ticket.ready_at(), false) {
            debug!(
                "cycle {}: demand fetch line {:#x} ready at {} (conflict={})",
                self.cycle,
                line,
                ticket.ready_at(),
                ticket.conflicted()
            );
        } else {
            // the earlier prefetch fill now carries the read
            let promoted = self.events.promote_to_demand(line);
            debug_assert!(promoted);
            self.metrics.record_demand_merge();
        }
    }

    fn issue_prefetches(&mut self) {
        let fast_tier = &self.fast_tier;
        let events = &self.events;
        let candidates = self
            .prefetcher
            .candidates(|line| fast_tier.contains(line) || events.is_in_flight(line));
        for line in candidates {
            let bank = bank_of_line(line, self.slow_banks.num_banks());
            let ticket = self.slow_banks.schedule(bank, self.cycle);
            let scheduled = self.events.schedule(line, ticket.ready_at(), true);
            debug_assert!(scheduled);
            self.metrics.record_prefetch();
            debug!(
                "cycle {}: prefetch line {:#x} ready at {} (conflict={})",
                self.cycle,
                line,
                ticket.ready_at(),
                ticket.conflicted()
            );
        }
    }
}

/// Simulate `ops` on a fresh engine. Independent calls share no state.
pub fn simulate<I>(config: HierarchyConfig, ops: I) -> Result<SimulationMetrics, SimError>
where
    I: IntoIterator<Item = MemOp>,
{
    let mut engine = SimulationEngine::new(config)?;
    Ok(engine.run(ops))
}
