use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Recorded as the response when an admitted element has lost its text by
/// the time it is dispatched.
pub const NO_TEXT_ERROR: &str = "no usable review text";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on elements in `processing` at once.
    pub max_concurrent: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

impl SchedulerConfig {
    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        Self { max_concurrent }
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_concurrent == 0 {
            return Err(SchedulerError::InvalidBound);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub queued: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub max_concurrent: usize,
}
