//! Debounced subtree-mutation watcher.
//!
//! A burst of mutations under any observed root coalesces into one re-scan
//! that fires `delay` after the last mutation of the burst.

use std::future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sentinel_core_types::NodeId;
use sentinel_page_dom::{Document, Element, PageEvent};
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

pub type RescanFn = Arc<dyn Fn() + Send + Sync>;

pub struct ChangeWatcher {
    delay: Duration,
    rescans: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl ChangeWatcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            rescans: Arc::new(AtomicU64::new(0)),
            task: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of re-scans fired so far.
    pub fn rescan_count(&self) -> u64 {
        self.rescans.load(Ordering::Relaxed)
    }

    /// Starts watching `roots` and calls `on_rescan` once per quiet period.
    /// Restarting replaces the previous watch.
    pub fn start(&mut self, document: &Document, roots: Vec<Element>, on_rescan: RescanFn) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }

        let delay = self.delay;
        let rescans = Arc::clone(&self.rescans);
        let shutdown = self.shutdown.clone();
        let mut rx = document.subscribe();

        self.task = Some(tokio::spawn(async move {
            debug!(target: "sentinel.watcher", roots = roots.len(), ?delay, "change watcher started");
            let mut deadline: Option<Instant> = None;
            loop {
                let quiet = async move {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => future::pending::<()>().await,
                    }
                };
                select! {
                    _ = shutdown.cancelled() => break,
                    _ = quiet => {
                        deadline = None;
                        rescans.fetch_add(1, Ordering::Relaxed);
                        debug!(target: "sentinel.watcher", "re-scan");
                        on_rescan();
                    }
                    event = rx.recv() => match event {
                        Ok(PageEvent::Mutation { target }) => {
                            if within_roots(&roots, target) {
                                trace!(target: "sentinel.watcher", node = %target, "mutation, re-arming");
                                deadline = Some(Instant::now() + delay);
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            warn!(target: "sentinel.watcher", missed, "page events lagged, forcing re-scan");
                            deadline = Some(Instant::now() + delay);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!(target: "sentinel.watcher", "change watcher exited");
        }));
    }

    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.task.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn within_roots(roots: &[Element], target: NodeId) -> bool {
    roots.iter().any(|root| {
        root.id() == target || root.descendants().iter().any(|node| node.id() == target)
    })
}
