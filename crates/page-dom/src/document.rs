use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;
use url::Url;

use crate::element::Element;
use crate::errors::PageError;
use crate::events::{page_event_bus, PageEvent, PageEventBus, PageEventStream};
use crate::geometry::Viewport;
use crate::selector::Selector;

const EVENT_BUFFER: usize = 1024;

pub(crate) struct DocumentShared {
    url: Url,
    body: Element,
    viewport: RwLock<Viewport>,
    events: PageEventBus,
}

impl DocumentShared {
    pub(crate) fn body(&self) -> Element {
        self.body.clone()
    }

    pub(crate) fn publish(&self, event: PageEvent) {
        trace!(target: "sentinel.dom", ?event, "page event");
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// One loaded page. Cheap to clone.
#[derive(Clone)]
pub struct Document {
    shared: Arc<DocumentShared>,
}

impl Document {
    pub fn new(url: &str, viewport: Viewport) -> Result<Self, PageError> {
        let url = Url::parse(url).map_err(|err| PageError::Url(format!("{url}: {err}")))?;
        let (events, _) = page_event_bus(EVENT_BUFFER);
        let shared = Arc::new_cyclic(|owner| DocumentShared {
            url,
            body: Element::new_node("body", owner.clone()),
            viewport: RwLock::new(viewport),
            events,
        });
        Ok(Self { shared })
    }

    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    pub fn host(&self) -> Option<&str> {
        self.shared.url.host_str()
    }

    pub fn body(&self) -> Element {
        self.shared.body()
    }

    /// Creates a detached element owned by this document.
    pub fn create_element(&self, tag: &str) -> Element {
        Element::new_node(tag, Arc::downgrade(&self.shared))
    }

    pub fn subscribe(&self) -> PageEventStream {
        self.shared.events.subscribe()
    }

    pub fn viewport(&self) -> Viewport {
        *self.shared.viewport.read()
    }

    pub fn scroll_to(&self, x: f64, y: f64) {
        let viewport = {
            let mut guard = self.shared.viewport.write();
            guard.scroll_x = x.max(0.0);
            guard.scroll_y = y.max(0.0);
            *guard
        };
        self.shared.publish(PageEvent::ViewportChanged { viewport });
    }

    /// Bottom edge of the lowest laid-out element.
    pub fn content_height(&self) -> f64 {
        let body = self.body();
        std::iter::once(body.clone())
            .chain(body.descendants())
            .map(|el| el.rect().bottom())
            .fold(0.0, f64::max)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        let body = self.body();
        std::iter::once(body.clone())
            .chain(body.descendants())
            .find(|el| el.html_id().as_deref() == Some(id))
    }

    /// Matches against the body and everything below it.
    pub fn select_all(&self, selector: &Selector) -> Vec<Element> {
        let body = self.body();
        std::iter::once(body.clone())
            .chain(body.descendants())
            .filter(|el| selector.matches(el))
            .collect()
    }

    pub fn select_first(&self, selector: &Selector) -> Option<Element> {
        let body = self.body();
        std::iter::once(body.clone())
            .chain(body.descendants())
            .find(|el| selector.matches(el))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, PageError> {
        Ok(self.select_all(&Selector::parse(selector)?))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>, PageError> {
        Ok(self.select_first(&Selector::parse(selector)?))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.shared.url.as_str())
            .field("viewport", &self.viewport())
            .finish()
    }
}
