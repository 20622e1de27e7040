pub mod address;
pub mod cache;
pub mod engine;
pub mod event_queue;
pub mod prefetch;
pub mod stats;


pub use address::{AddressMapper, LineId};
pub use cache::TierCache;
pub use engine::{simulate, DemandState, SimulationEngine};
pub use event_queue::{Arrival, EventQueue};
pub use prefetch::{PrefetchConfig, StreamPrefetcher, StreamState};
pub use stats::{percentile, LatencySummary, SimulationMetrics};
