use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use extensions_bridge::{normalize, ScoringClient};
use sentinel_core_types::{ElementStatus, PredictionResponse};
use sentinel_extractor::SiteExtractor;
use sentinel_page_dom::Element;
use sentinel_state_center::ElementStateRegistry;

use crate::api::ResultSink;
use crate::error::SchedulerError;
use crate::lane::{AdmissionQueue, Job};
use crate::metrics;
use crate::model::{SchedulerConfig, SchedulerSnapshot, NO_TEXT_ERROR};

#[derive(Debug, Default)]
struct Inner {
    queue: AdmissionQueue,
    in_flight: usize,
    peak_in_flight: usize,
}

/// Pops admitted elements in FIFO order and keeps at most `max_concurrent`
/// scoring calls outstanding.
///
/// The queue and the in-flight count share one lock, and an element is moved
/// to `processing` under that lock before its call is spawned. The status
/// count and the in-flight count therefore never disagree.
pub struct AdmissionScheduler {
    config: SchedulerConfig,
    extractor: SiteExtractor,
    registry: Arc<ElementStateRegistry>,
    client: Arc<dyn ScoringClient>,
    sink: Arc<dyn ResultSink>,
    inner: Mutex<Inner>,
    pending: watch::Sender<usize>,
}

impl AdmissionScheduler {
    pub fn new(
        config: SchedulerConfig,
        extractor: SiteExtractor,
        registry: Arc<ElementStateRegistry>,
        client: Arc<dyn ScoringClient>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Arc<Self>, SchedulerError> {
        config.validate()?;
        let (pending, _) = watch::channel(0);
        Ok(Arc::new(Self {
            config,
            extractor,
            registry,
            client,
            sink,
            inner: Mutex::new(Inner::default()),
            pending,
        }))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Enqueues an element whose state is already `queued`, then pumps.
    pub fn admit(self: &Arc<Self>, element: &Element) -> Result<(), SchedulerError> {
        let node = element.id();
        match self.registry.status(node) {
            None => return Err(SchedulerError::NotTracked(node)),
            Some(ElementStatus::Queued) => {}
            Some(status) => return Err(SchedulerError::NotQueued { node, status }),
        }
        {
            let mut inner = self.inner.lock();
            let job = inner.queue.push(element);
            debug!(target: "sentinel.scheduler", node = %job.node, seq = job.seq, "admitted");
            self.publish_pending(&inner);
        }
        metrics::record_admitted();
        self.pump();
        Ok(())
    }

    /// Dispatches queued elements until the bound is reached or the queue
    /// runs dry.
    pub fn pump(self: &Arc<Self>) {
        loop {
            let (job, element) = {
                let mut inner = self.inner.lock();
                if inner.in_flight >= self.config.max_concurrent {
                    return;
                }
                let Some(job) = inner.queue.pop() else {
                    self.publish_pending(&inner);
                    return;
                };
                let Some(element) = job.element.upgrade() else {
                    debug!(target: "sentinel.scheduler", node = %job.node, "element dropped while queued");
                    metrics::record_skipped();
                    self.publish_pending(&inner);
                    continue;
                };
                if !self.registry.begin_processing(job.node) {
                    debug!(target: "sentinel.scheduler", node = %job.node, "stale queue entry skipped");
                    metrics::record_skipped();
                    self.publish_pending(&inner);
                    continue;
                }
                inner.in_flight += 1;
                inner.peak_in_flight = inner.peak_in_flight.max(inner.in_flight);
                self.publish_pending(&inner);
                (job, element)
            };
            metrics::record_dispatched();
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                scheduler.dispatch(job, element).await;
            });
        }
    }

    async fn dispatch(self: Arc<Self>, job: Job, element: Element) {
        let response = match self.extractor.prediction_request(&element) {
            Some(request) => normalize(self.client.predict(&request).await),
            None => {
                warn!(target: "sentinel.scheduler", node = %job.node, "review text vanished before dispatch");
                PredictionResponse::error(NO_TEXT_ERROR)
            }
        };

        if response.is_error() {
            metrics::record_failed();
        } else {
            metrics::record_completed();
        }
        debug!(
            target: "sentinel.scheduler",
            node = %job.node,
            seq = job.seq,
            error = response.is_error(),
            "settled"
        );

        let slot = self.registry.complete(job.node, response.clone());
        self.sink.settled(&element, slot, &response);

        {
            let mut inner = self.inner.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
            self.publish_pending(&inner);
        }
        self.pump();
    }

    fn publish_pending(&self, inner: &Inner) {
        self.pending.send_replace(inner.queue.len() + inner.in_flight);
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let inner = self.inner.lock();
        SchedulerSnapshot {
            queued: inner.queue.len(),
            in_flight: inner.in_flight,
            peak_in_flight: inner.peak_in_flight,
            max_concurrent: self.config.max_concurrent,
        }
    }

    /// Resolves once nothing is queued or in flight.
    pub async fn wait_idle(&self) {
        let mut pending = self.pending.subscribe();
        // the sender lives in `self`, so this only fails if `self` is gone
        let _ = pending.wait_for(|count| *count == 0).await;
    }
}
