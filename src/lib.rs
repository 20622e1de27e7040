pub mod hier;
pub mod sim;
pub mod timeq;

pub use hier::{simulate, SimulationEngine, SimulationMetrics};
pub use sim::config::HierarchyConfig;
pub use sim::error::{ConfigError, SimError, TraceError};
pub use sim::trace::{MemOp, OpKind};
