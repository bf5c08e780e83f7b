//! In-process model of the host page the annotation pipeline runs against.
//!
//! The model keeps only what the pipeline observes on a real page: an element
//! tree with classes/attributes/text, layout rectangles, a scrollable viewport,
//! click handlers, and a broadcast bus carrying child-list mutations and
//! viewport/layout changes.

pub mod document;
pub mod element;
pub mod errors;
pub mod events;
pub mod geometry;
pub mod selector;

pub use document::Document;
pub use element::{ClickHandler, Element, WeakElement};
pub use errors::PageError;
pub use events::{PageEvent, PageEventBus, PageEventStream};
pub use geometry::{intersection_ratio, Rect, RootMargin, Viewport};
pub use selector::Selector;
