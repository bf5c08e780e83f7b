//! Auto-scoring: discovery, visibility gating, admission and rendering wired
//! together for one page.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use extensions_bridge::ScoringClient;
use sentinel_core_types::{ElementStatus, SentinelError};
use sentinel_extractor::SiteExtractor;
use sentinel_page_dom::{Document, Element};
use sentinel_scheduler::{AdmissionScheduler, SchedulerConfig, SchedulerSnapshot};
use sentinel_state_center::ElementStateRegistry;

use crate::manual::ManualCheck;
use crate::modal::PageModal;
use crate::render::ResultRenderer;
use crate::visibility::{GateOptions, VisibilityGate, VisibilityHandler};
use crate::watcher::{ChangeWatcher, DEFAULT_DEBOUNCE};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutoScoringOptions {
    pub max_concurrent: usize,
    pub debounce: Duration,
    pub gate: GateOptions,
    /// Also add a "Check Authenticity" button to every discovered review.
    pub check_buttons: bool,
}

impl Default for AutoScoringOptions {
    fn default() -> Self {
        Self {
            max_concurrent: SchedulerConfig::default().max_concurrent,
            debounce: DEFAULT_DEBOUNCE,
            gate: GateOptions::default(),
            check_buttons: false,
        }
    }
}

/// Turns a visible element into a queued one.
struct Admitter {
    extractor: SiteExtractor,
    registry: Arc<ElementStateRegistry>,
    renderer: Arc<ResultRenderer>,
    scheduler: Arc<AdmissionScheduler>,
}

impl VisibilityHandler for Admitter {
    fn on_visible(&self, element: &Element) {
        let node = element.id();
        self.registry.register(element);
        if self.registry.status(node) != Some(ElementStatus::Idle) {
            return;
        }
        if self.extractor.review_text(element).is_empty() {
            debug!(target: "sentinel.gate", node = %node, "no review text, not admitting");
            return;
        }

        let slot = self.renderer.slot_for(element);
        self.renderer.render_loading(&slot);
        // queued before the push, so a concurrent re-scan sees the real status
        if !self.registry.mark_queued(node, slot) {
            return;
        }
        if let Err(err) = self.scheduler.admit(element) {
            warn!(target: "sentinel.gate", node = %node, %err, "admission refused");
        }
    }
}

/// Full element discovery, shared by the initial scan and every re-scan.
struct Discovery {
    document: Document,
    extractor: SiteExtractor,
    registry: Arc<ElementStateRegistry>,
    gate: Arc<VisibilityGate>,
    buttons: Option<Arc<ManualCheck>>,
}

impl Discovery {
    /// Returns how many elements were seen for the first time.
    fn scan(&self) -> usize {
        let evicted = self.registry.evict_dropped();
        let mut fresh = 0;
        for review in self.extractor.find_review_elements(&self.document) {
            if let Some(buttons) = &self.buttons {
                buttons.inject(&review);
            }
            if self.registry.register(&review) {
                fresh += 1;
                self.gate.observe(&review);
            }
        }
        debug!(target: "sentinel.watcher", fresh, evicted, tracked = self.registry.len(), "discovery");
        fresh
    }
}

pub struct AutoScorer {
    extractor: SiteExtractor,
    registry: Arc<ElementStateRegistry>,
    modal: Arc<PageModal>,
    renderer: Arc<ResultRenderer>,
    scheduler: Arc<AdmissionScheduler>,
    gate: Arc<VisibilityGate>,
    discovery: Arc<Discovery>,
    watcher: Mutex<Option<ChangeWatcher>>,
}

impl AutoScorer {
    /// Scans the page, then keeps watching it for new reviews until
    /// [`AutoScorer::shutdown`]. Must run inside a tokio runtime.
    pub fn enable(
        document: Document,
        extractor: SiteExtractor,
        client: Arc<dyn ScoringClient>,
        options: AutoScoringOptions,
    ) -> Result<Arc<Self>, SentinelError> {
        Handle::try_current()
            .map_err(|err| SentinelError::new(format!("auto-scoring needs a runtime: {err}")))?;

        let registry = Arc::new(ElementStateRegistry::default());
        let modal = PageModal::new(document.clone());
        let renderer = Arc::new(ResultRenderer::new(
            document.clone(),
            extractor,
            modal.clone(),
        ));
        let scheduler = AdmissionScheduler::new(
            SchedulerConfig::with_max_concurrent(options.max_concurrent),
            extractor,
            Arc::clone(&registry),
            Arc::clone(&client),
            renderer.clone(),
        )?;
        let admitter = Arc::new(Admitter {
            extractor,
            registry: Arc::clone(&registry),
            renderer: Arc::clone(&renderer),
            scheduler: Arc::clone(&scheduler),
        });
        let gate = VisibilityGate::new(document.clone(), options.gate, admitter);
        let buttons = if options.check_buttons {
            Some(ManualCheck::new(
                document.clone(),
                extractor,
                client,
                modal.clone(),
            )?)
        } else {
            None
        };
        let discovery = Arc::new(Discovery {
            document: document.clone(),
            extractor,
            registry: Arc::clone(&registry),
            gate: Arc::clone(&gate),
            buttons,
        });

        let found = discovery.scan();
        gate.start();

        let mut watcher = ChangeWatcher::new(options.debounce);
        let rescan = Arc::clone(&discovery);
        watcher.start(
            &document,
            extractor.observe_roots(&document),
            Arc::new(move || {
                rescan.scan();
            }),
        );
        info!(
            target: "sentinel.watcher",
            site = %extractor,
            found,
            max_concurrent = options.max_concurrent,
            "auto-scoring enabled"
        );

        Ok(Arc::new(Self {
            extractor,
            registry,
            modal,
            renderer,
            scheduler,
            gate,
            discovery,
            watcher: Mutex::new(Some(watcher)),
        }))
    }

    pub fn extractor(&self) -> SiteExtractor {
        self.extractor
    }

    pub fn registry(&self) -> &Arc<ElementStateRegistry> {
        &self.registry
    }

    pub fn modal(&self) -> &Arc<PageModal> {
        &self.modal
    }

    pub fn renderer(&self) -> &Arc<ResultRenderer> {
        &self.renderer
    }

    pub fn gate(&self) -> &Arc<VisibilityGate> {
        &self.gate
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.scheduler.snapshot()
    }

    pub fn rescan_count(&self) -> u64 {
        self.watcher
            .lock()
            .as_ref()
            .map_or(0, ChangeWatcher::rescan_count)
    }

    /// Runs discovery now instead of waiting for the watcher.
    pub fn refresh(&self) -> usize {
        self.discovery.scan()
    }

    /// Re-checks observed elements against the current viewport.
    pub fn evaluate_visibility(&self) -> usize {
        self.gate.evaluate_all()
    }

    /// Forgets every scored element, removes its badge, and discovers again
    /// so visible reviews are scored afresh.
    pub fn reset(&self) -> usize {
        let slots = self.registry.reset_done();
        let cleared = slots.len();
        for slot in slots {
            slot.remove();
        }
        let fresh = self.discovery.scan();
        info!(target: "sentinel.watcher", cleared, fresh, "reset");
        fresh
    }

    /// Resolves once every admitted element has settled.
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    /// Stops discovery: the watcher and the gate. Admitted reviews are not
    /// cancelled; they keep dispatching and render as they settle, which
    /// [`AutoScorer::wait_idle`] observes.
    pub async fn shutdown(&self) {
        let watcher = self.watcher.lock().take();
        if let Some(mut watcher) = watcher {
            watcher.stop().await;
        }
        self.gate.stop().await;
        let pending = self.scheduler.snapshot();
        info!(
            target: "sentinel.watcher",
            queued = pending.queued,
            in_flight = pending.in_flight,
            "auto-scoring stopped"
        );
    }
}
