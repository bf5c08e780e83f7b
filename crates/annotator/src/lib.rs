//! Viewport-driven review annotation.
//!
//! [`AutoScorer`] discovers reviews through the [`ChangeWatcher`], admits
//! them once the [`VisibilityGate`] sees them, and renders each outcome as an
//! inline badge with a shared details modal.

pub mod manual;
pub mod modal;
pub mod pipeline;
pub mod render;
pub mod visibility;
pub mod watcher;

pub use manual::ManualCheck;
pub use modal::{ModalContent, ModalService, PageModal};
pub use pipeline::{AutoScorer, AutoScoringOptions};
pub use render::{badge_of, format_percent, ResultRenderer, Verdict};
pub use visibility::{GateOptions, VisibilityGate, VisibilityHandler};
pub use watcher::{ChangeWatcher, DEFAULT_DEBOUNCE};
