//! Page-side scoring client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use sentinel_core_types::{PredictionRequest, PredictionResponse};

use crate::{Bridge, BridgeError, BridgeMessage};

/// Submits one review for scoring.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, BridgeError>;
}

#[async_trait]
impl<C> ScoringClient for Arc<C>
where
    C: ScoringClient + ?Sized,
{
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, BridgeError> {
        (**self).predict(request).await
    }
}

/// Folds a transport failure into an error response so callers only ever see
/// a [`PredictionResponse`].
pub fn normalize(outcome: Result<PredictionResponse, BridgeError>) -> PredictionResponse {
    match outcome {
        Ok(response) => response,
        Err(err) => PredictionResponse::error(err.to_string()),
    }
}

/// Scores reviews by messaging the background context.
#[derive(Clone)]
pub struct BridgeScoringClient {
    bridge: Arc<dyn Bridge>,
}

impl BridgeScoringClient {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl ScoringClient for BridgeScoringClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, BridgeError> {
        let reply = self.bridge.send_message(BridgeMessage::predict(request)).await?;
        let response = PredictionResponse::from_value(&reply);
        debug!(target: "sentinel.bridge", error = response.is_error(), "reply decoded");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_turns_transport_failure_into_error_response() {
        let response = normalize(Err(BridgeError::ContextInvalidated));
        assert_eq!(
            response,
            PredictionResponse::error("Extension context invalidated.")
        );
        let response = normalize(Ok(PredictionResponse::score(0.3)));
        assert_eq!(response.score_value(), Some(0.3));
    }
}
