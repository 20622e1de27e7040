use std::path::PathBuf;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use toml::Value;

use crate::sim::error::ConfigError;
use crate::timeq::Cycle;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    pub trace: PathBuf,
    pub log_level: u64,
    pub metrics_json: Option<PathBuf>,
}

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> Result<Self, toml::de::Error> {
        match section {
            Some(value) => value.clone().try_into(),
            None => {
                warn!("config section not found");
                Ok(Self::default())
            }
        }
    }
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trace: PathBuf::new(),
            log_level: 0,
            metrics_json: None,
        }
    }
}

/// Geometry and timing of the two-tier hierarchy plus the prefetch engine.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct HierarchyConfig {
    pub fast_tier_bytes: u64,
    pub fast_tier_banks: usize,
    pub slow_tier_banks: usize,
    pub line_bytes: u64,
    pub fast_latency: Cycle,
    pub slow_latency: Cycle,
    pub conflict_penalty: Cycle,
    /// Prefetches issued per cycle; zero disables prefetching.
    pub prefetch_issue_width: usize,
    /// Lines ahead of the last demand read considered for prefetch; zero disables prefetching.
    pub prefetch_look_ahead: u64,
}

impl Config for HierarchyConfig {}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            fast_tier_bytes: 32 << 20,
            fast_tier_banks: 4,
            slow_tier_banks: 14,
            line_bytes: 128,
            fast_latency: 1,
            slow_latency: 3,
            conflict_penalty: 5,
            prefetch_issue_width: 4,
            prefetch_look_ahead: 16,
        }
    }
}

impl HierarchyConfig {
    /// Reject any parameter the engine cannot run with, before a single cycle is simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("fast_tier_bytes", self.fast_tier_bytes),
            ("fast_tier_banks", self.fast_tier_banks as u64),
            ("slow_tier_banks", self.slow_tier_banks as u64),
            ("line_bytes", self.line_bytes),
            ("fast_latency", self.fast_latency),
            ("slow_latency", self.slow_latency),
            ("conflict_penalty", self.conflict_penalty),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NotPositive { field });
        }
        if self.fast_tier_bytes < self.line_bytes {
            return Err(ConfigError::TierSmallerThanLine {
                fast_tier_bytes: self.fast_tier_bytes,
                line_bytes: self.line_bytes,
            });
        }
        Ok(())
    }

    pub fn fast_tier_lines(&self) -> usize {
        (self.fast_tier_bytes / self.line_bytes) as usize
    }

    #[cfg(test)]
    pub(crate) fn prefetch_enabled(&self) -> bool {
        self.prefetch_issue_width > 0 && self.prefetch_look_ahead > 0
    }
}
