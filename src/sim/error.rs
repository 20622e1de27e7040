use thiserror::Error;

/// A configuration parameter that violates its precondition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },
    #[error("fast_tier_bytes ({fast_tier_bytes}) must hold at least one {line_bytes}-byte line")]
    TierSmallerThanLine { fast_tier_bytes: u64, line_bytes: u64 },
}

/// A malformed trace entry. `entry` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trace entry {entry}: {reason}")]
pub struct TraceError {
    pub entry: usize,
    pub reason: String,
}

impl TraceError {
    pub fn new(entry: usize, reason: impl Into<String>) -> Self {
        Self {
            entry,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("malformed trace: {0}")]
    Trace(#[from] TraceError),
}
