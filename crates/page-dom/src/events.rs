use sentinel_core_types::NodeId;
use tokio::sync::broadcast;

use crate::geometry::Viewport;

/// Change notifications published by a [`crate::Document`].
#[derive(Clone, Debug, PartialEq)]
pub enum PageEvent {
    /// The child list (or text) of a connected node changed.
    Mutation { target: NodeId },
    /// The viewport scrolled.
    ViewportChanged { viewport: Viewport },
    /// A connected node moved or changed size.
    LayoutChanged { target: NodeId },
}

pub type PageEventBus = broadcast::Sender<PageEvent>;
pub type PageEventStream = broadcast::Receiver<PageEvent>;

pub fn page_event_bus(buffer: usize) -> (PageEventBus, PageEventStream) {
    broadcast::channel(buffer.max(1))
}
