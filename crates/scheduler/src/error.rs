use thiserror::Error;

use sentinel_core_types::{ElementStatus, NodeId, SentinelError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("max_concurrent must be at least 1")]
    InvalidBound,
    #[error("element {0} is not tracked")]
    NotTracked(NodeId),
    #[error("element {node} is {status}, only queued elements can be admitted")]
    NotQueued { node: NodeId, status: ElementStatus },
}

impl From<SchedulerError> for SentinelError {
    fn from(value: SchedulerError) -> Self {
        SentinelError::new(format!("scheduler error: {value}"))
    }
}
