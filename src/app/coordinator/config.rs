//! Configuration structures for the sync coordinator

use serde::{Deserialize, Serialize};

use crate::constants::sync;

/// Configuration for the sync coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Archives more than this many days old are not downloaded
    pub retention_days: i64,
    /// Entries more than this many days old are pruned after a sync
    /// (0 disables pruning)
    pub keep_days: i64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retention_days: sync::DEFAULT_RETENTION_DAYS,
            keep_days: sync::DEFAULT_KEEP_DAYS,
        }
    }
}

impl CoordinatorConfig {
    /// Set the download retention window
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Set the prune window
    pub fn with_keep_days(mut self, days: i64) -> Self {
        self.keep_days = days;
        self
    }

    /// Whether a sync should be followed by pruning
    pub fn prune_enabled(&self) -> bool {
        self.keep_days > 0
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.retention_days < 0 {
            return Err("Retention days cannot be negative".to_string());
        }

        if self.keep_days < 0 {
            return Err("Keep days cannot be negative".to_string());
        }

        Ok(())
    }
}
