//! One-shot viewport intersection gate.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use sentinel_core_types::NodeId;
use sentinel_page_dom::{intersection_ratio, Document, Element, PageEvent, RootMargin, WeakElement};

/// Intersection settings. The margin grows the viewport so reviews just
/// below the fold are admitted before they scroll in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateOptions {
    pub root_margin: RootMargin,
    pub threshold: f64,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            root_margin: RootMargin::vertical(200.0),
            threshold: 0.1,
        }
    }
}

/// Called once per observed element, the first time it intersects.
pub trait VisibilityHandler: Send + Sync {
    fn on_visible(&self, element: &Element);
}

impl<F> VisibilityHandler for F
where
    F: Fn(&Element) + Send + Sync,
{
    fn on_visible(&self, element: &Element) {
        self(element)
    }
}

pub struct VisibilityGate {
    document: Document,
    options: GateOptions,
    observed: DashMap<NodeId, WeakElement>,
    handler: Arc<dyn VisibilityHandler>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl VisibilityGate {
    pub fn new(
        document: Document,
        options: GateOptions,
        handler: Arc<dyn VisibilityHandler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            document,
            options,
            observed: DashMap::new(),
            handler,
            task: Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn options(&self) -> GateOptions {
        self.options
    }

    /// Starts observing and evaluates the element right away, the way a
    /// fresh intersection observer reports its initial state.
    pub fn observe(&self, element: &Element) {
        self.observed.insert(element.id(), element.downgrade());
        trace!(target: "sentinel.gate", node = %element.id(), "observing");
        if self.is_intersecting(element) {
            self.promote(vec![element.clone()]);
        }
    }

    pub fn is_observing(&self, node: NodeId) -> bool {
        self.observed.contains_key(&node)
    }

    pub fn is_intersecting(&self, element: &Element) -> bool {
        if !element.is_connected() {
            return false;
        }
        let ratio = intersection_ratio(
            element.rect(),
            &self.document.viewport(),
            &self.options.root_margin,
        );
        ratio > 0.0 && ratio >= self.options.threshold
    }

    /// Re-checks every observed element and promotes the ones now visible.
    /// Returns how many were promoted.
    pub fn evaluate_all(&self) -> usize {
        let mut visible = Vec::new();
        let mut dead = Vec::new();
        for entry in self.observed.iter() {
            match entry.value().upgrade() {
                Some(element) if self.is_intersecting(&element) => visible.push(element),
                Some(_) => {}
                None => dead.push(*entry.key()),
            }
        }
        for node in dead {
            self.observed.remove(&node);
        }
        let promoted = visible.len();
        self.promote(visible);
        promoted
    }

    fn promote(&self, elements: Vec<Element>) {
        for element in elements {
            // one-shot: whoever removes the entry hands it over
            if self.observed.remove(&element.id()).is_none() {
                continue;
            }
            debug!(target: "sentinel.gate", node = %element.id(), "intersecting");
            self.handler.on_visible(&element);
        }
    }

    /// Re-evaluates on every scroll and layout change.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.task.lock();
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        let gate = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        let mut rx = self.document.subscribe();

        *slot = Some(tokio::spawn(async move {
            debug!(target: "sentinel.gate", "visibility gate started");
            loop {
                select! {
                    _ = shutdown.cancelled() => break,
                    event = rx.recv() => {
                        let Some(gate) = gate.upgrade() else { break };
                        match event {
                            Ok(PageEvent::ViewportChanged { .. }) => {
                                gate.evaluate_all();
                            }
                            Ok(PageEvent::LayoutChanged { target }) => {
                                if gate.is_observing(target) {
                                    gate.evaluate_all();
                                }
                            }
                            Ok(PageEvent::Mutation { .. }) => {}
                            Err(RecvError::Lagged(missed)) => {
                                warn!(target: "sentinel.gate", missed, "page events lagged, re-evaluating");
                                gate.evaluate_all();
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                }
            }
            debug!(target: "sentinel.gate", "visibility gate exited");
        }));
    }

    pub async fn stop(&self) {
        self.shutdown.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for VisibilityGate {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
