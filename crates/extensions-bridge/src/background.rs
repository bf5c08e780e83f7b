//! Privileged side of the bridge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use sentinel_core_types::PredictionRequest;

use crate::{BridgeError, BridgeEvent, BridgeEventBus, Envelope, ExtensionsBridge, PREDICT_ACTION};

/// Performs the actual scoring call for the background context.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Scores one review. `Ok(None)` means the service answered without a
    /// score for it.
    async fn predict(&self, review: &PredictionRequest) -> Result<Option<f64>, BridgeError>;
}

#[async_trait]
impl<B> PredictionBackend for Arc<B>
where
    B: PredictionBackend + ?Sized,
{
    async fn predict(&self, review: &PredictionRequest) -> Result<Option<f64>, BridgeError> {
        (**self).predict(review).await
    }
}

/// Listens for bridge messages and answers `predict` requests.
pub struct BackgroundService {
    backend: Arc<dyn PredictionBackend>,
    events: BridgeEventBus,
}

/// Keeps the background context alive; dropping the service side closes the bridge.
pub struct BackgroundHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BackgroundHandle {
    /// Stops the background context. Later sends fail with
    /// [`BridgeError::ContextInvalidated`].
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for BackgroundHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl BackgroundService {
    pub fn new(backend: Arc<dyn PredictionBackend>, events: BridgeEventBus) -> Self {
        Self { backend, events }
    }

    /// Starts the background loop and returns the page-side bridge.
    pub fn spawn(self, capacity: usize) -> (ExtensionsBridge, BackgroundHandle) {
        let (sender, mut receiver) = mpsc::channel::<Envelope>(capacity.max(1));
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let backend = self.backend;
        let events = self.events;

        let task = tokio::spawn(async move {
            debug!(target: "sentinel.bridge", "background context started");
            loop {
                select! {
                    _ = token.cancelled() => break,
                    envelope = receiver.recv() => {
                        let Some(envelope) = envelope else { break };
                        route(&backend, &events, envelope);
                    }
                }
            }
            receiver.close();
            debug!(target: "sentinel.bridge", "background context stopped");
        });

        (
            ExtensionsBridge::new(sender),
            BackgroundHandle {
                shutdown,
                task: Some(task),
            },
        )
    }
}

fn route(backend: &Arc<dyn PredictionBackend>, events: &BridgeEventBus, envelope: Envelope) {
    let Envelope { message, reply } = envelope;
    if message.action != PREDICT_ACTION {
        debug!(target: "sentinel.bridge", action = %message.action, "no listener for action");
        let _ = events.send(BridgeEvent::Ignored {
            action: message.action,
        });
        // dropping `reply` closes the port
        return;
    }

    let backend = Arc::clone(backend);
    let events = events.clone();
    tokio::spawn(async move {
        let answer = handle_predict(backend.as_ref(), &events, message.data).await;
        if reply.send(answer).is_err() {
            debug!(target: "sentinel.bridge", "page side went away before the reply");
        }
    });
}

async fn handle_predict(
    backend: &dyn PredictionBackend,
    events: &BridgeEventBus,
    data: Value,
) -> Value {
    let outcome = match serde_json::from_value::<PredictionRequest>(data) {
        Ok(review) => backend.predict(&review).await,
        Err(err) => Err(BridgeError::InvalidPayload(err.to_string())),
    };
    match outcome {
        Ok(score) => {
            let _ = events.send(BridgeEvent::PredictOk { score });
            match score {
                Some(score) => json!({ "score": score }),
                None => {
                    warn!(target: "sentinel.bridge", "scoring service returned no score");
                    json!({})
                }
            }
        }
        Err(err) => {
            let error = err.to_string();
            warn!(target: "sentinel.bridge", %error, "prediction failed");
            let _ = events.send(BridgeEvent::PredictFailed {
                error: error.clone(),
            });
            json!({ "error": error })
        }
    }
}
