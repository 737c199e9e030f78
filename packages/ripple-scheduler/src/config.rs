use crate::error::SchedulerError;
use crate::scheduler::MAX_UPDATE_COUNT;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Re-entries a single subscriber may make within one flush before the flush is aborted.
    pub max_update_count: u32,
    /// Development only: flush synchronously on the first enqueue instead of batching.
    pub sync: bool,
    /// Notify the flush observer after every flush.
    pub devtools: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_update_count: MAX_UPDATE_COUNT,
            sync: false,
            devtools: cfg!(debug_assertions),
        }
    }
}

impl SchedulerConfig {
    pub fn from_json(json: &str) -> Result<Self, SchedulerError> {
        Ok(serde_json::from_str(json)?)
    }
}
