use serde::Serialize;

use crate::timeq::{BankStats, Cycle};

/// Counters accumulated over a run. Every field only grows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    hits: u64,
    misses: u64,
    read_latencies: Vec<Cycle>,
    demand_reads: u64,
    demand_fetches: u64,
    demand_merges: u64,
    prefetch_issues: u64,
    cycles: Cycle,
    fast_banks: BankStats,
    slow_banks: BankStats,
}

impl SimulationMetrics {
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn reads(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    pub fn read_latencies(&self) -> &[Cycle] {
        &self.read_latencies
    }

    pub fn demand_reads(&self) -> u64 {
        self.demand_reads
    }

    // Demand misses sent to the slow tier; equals `misses`.
    pub fn demand_fetches(&self) -> u64 {
        self.demand_fetches
    }

    // Demand misses whose line was already in flight as a prefetch.
    pub fn demand_merges(&self) -> u64 {
        self.demand_merges
    }

    pub fn prefetch_issues(&self) -> u64 {
        self.prefetch_issues
    }

    pub fn cycles(&self) -> Cycle {
        self.cycles
    }

    pub fn fast_banks(&self) -> BankStats {
        self.fast_banks
    }

    pub fn slow_banks(&self) -> BankStats {
        self.slow_banks
    }

    /// Fast-tier hit rate in percent; zero when no reads were admitted.
    pub fn hit_rate(&self) -> f64 {
        let total = self.reads();
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }

    /// Accesses charged to the compute side: every demand read plus every demand fetch.
    pub fn demand_bandwidth(&self) -> u64 {
        self.demand_reads.saturating_add(self.demand_fetches)
    }

    pub fn prefetch_bandwidth(&self) -> u64 {
        self.prefetch_issues
    }

    pub fn p50_latency(&self) -> f64 {
        percentile(&self.read_latencies, 50.0)
    }

    pub fn p90_latency(&self) -> f64 {
        percentile(&self.read_latencies, 90.0)
    }

    pub fn p99_latency(&self) -> f64 {
        percentile(&self.read_latencies, 99.0)
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            hit_rate: self.hit_rate(),
            p50: self.p50_latency(),
            p90: self.p90_latency(),
            p99: self.p99_latency(),
        }
    }

    pub(crate) fn record_hit(&mut self, latency: Cycle) {
        self.demand_reads = self.demand_reads.saturating_add(1);
        self.hits = self.hits.saturating_add(1);
        self.read_latencies.push(latency);
    }

    pub(crate) fn record_miss(&mut self) {
        self.demand_reads = self.demand_reads.saturating_add(1);
        self.misses = self.misses.saturating_add(1);
    }

    pub(crate) fn record_fill_latency(&mut self, latency: Cycle) {
        self.read_latencies.push(latency);
    }

    pub(crate) fn record_demand_fetch(&mut self) {
        self.demand_fetches = self.demand_fetches.saturating_add(1);
    }

    pub(crate) fn record_demand_merge(&mut self) {
        self.demand_merges = self.demand_merges.saturating_add(1);
    }

    pub(crate) fn record_prefetch(&mut self) {
        self.prefetch_issues = self.prefetch_issues.saturating_add(1);
    }

    pub(crate) fn set_cycles(&mut self, cycles: Cycle) {
        debug_assert!(cycles >= self.cycles);
        self.cycles = cycles;
    }

    pub(crate) fn set_bank_stats(&mut self, fast: BankStats, slow: BankStats) {
        self.fast_banks = fast;
        self.slow_banks = slow;
    }
}

/// Derived figures, in the form written to the metrics report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub hit_rate: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Percentile with linear interpolation between the two closest ranks. Zero for no samples.
pub fn percentile(samples: &[Cycle], pct: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}
