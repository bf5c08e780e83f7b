pub mod api;
pub mod error;
pub mod lane;
pub mod metrics;
pub mod model;
pub mod runtime;

pub use api::ResultSink;
pub use error::SchedulerError;
pub use lane::{AdmissionQueue, Job};
pub use model::{SchedulerConfig, SchedulerSnapshot, NO_TEXT_ERROR};
pub use runtime::AdmissionScheduler;
