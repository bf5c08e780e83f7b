//! Bridge between the page context and the privileged background context.
//!
//! The page never talks to the scoring service directly. It sends a
//! `{action, data}` message over the bridge; the background service performs
//! the HTTP call and answers with `{score}` or `{error}`. When the background
//! context is gone the send itself fails, which is the transport-level
//! outcome [`client::normalize`] folds into an error response.

pub mod background;
pub mod client;
pub mod config;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::trace;

use sentinel_core_types::PredictionRequest;

pub use background::{BackgroundHandle, BackgroundService, PredictionBackend};
pub use client::{normalize, BridgeScoringClient, ScoringClient};
pub use config::BridgeConfig;
pub use http::HttpPredictionBackend;

pub const PREDICT_ACTION: &str = "predict";

/// Message envelope carried over the bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub action: String,
    pub data: serde_json::Value,
}

impl BridgeMessage {
    pub fn predict(request: &PredictionRequest) -> Self {
        Self {
            action: PREDICT_ACTION.to_string(),
            data: serde_json::json!({
                "text": request.text,
                "rating": request.rating,
            }),
        }
    }
}

/// Errors surfaced by the bridge and the background service.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Extension context invalidated.")]
    ContextInvalidated,
    #[error("The message port closed before a response was received.")]
    PortClosed,
    #[error("Server error: {0}")]
    ServerStatus(u16),
    #[error("{0}")]
    Service(String),
    #[error("{0}")]
    Transport(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Events emitted by the background service to observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BridgeEvent {
    PredictOk { score: Option<f64> },
    PredictFailed { error: String },
    Ignored { action: String },
}

pub type BridgeEventBus = broadcast::Sender<BridgeEvent>;

pub fn bridge_event_bus(buffer: usize) -> (BridgeEventBus, broadcast::Receiver<BridgeEvent>) {
    broadcast::channel(buffer.max(1))
}

#[async_trait]
pub trait Bridge: Send + Sync {
    /// Sends one message and waits for the reply.
    async fn send_message(&self, message: BridgeMessage) -> Result<serde_json::Value, BridgeError>;
}

pub(crate) struct Envelope {
    pub(crate) message: BridgeMessage,
    pub(crate) reply: oneshot::Sender<serde_json::Value>,
}

/// Page-side end of the bridge.
#[derive(Clone)]
pub struct ExtensionsBridge {
    sender: mpsc::Sender<Envelope>,
}

impl ExtensionsBridge {
    pub(crate) fn new(sender: mpsc::Sender<Envelope>) -> Self {
        Self { sender }
    }

    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[async_trait]
impl Bridge for ExtensionsBridge {
    async fn send_message(&self, message: BridgeMessage) -> Result<serde_json::Value, BridgeError> {
        let (reply, response) = oneshot::channel();
        let action = message.action.clone();
        self.sender
            .send(Envelope { message, reply })
            .await
            .map_err(|_| BridgeError::ContextInvalidated)?;
        trace!(target: "sentinel.bridge", %action, "message delivered");
        response.await.map_err(|_| BridgeError::PortClosed)
    }
}
