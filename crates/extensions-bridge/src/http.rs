use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sentinel_core_types::PredictionRequest;

use crate::background::PredictionBackend;
use crate::config::BridgeConfig;
use crate::BridgeError;

#[derive(Debug, Serialize)]
struct PredictBody<'a> {
    reviews: [&'a PredictionRequest; 1],
}

#[derive(Debug, Default, Deserialize)]
struct PredictReply {
    #[serde(default)]
    scores: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Calls the scoring service over HTTP.
pub struct HttpPredictionBackend {
    client: Client,
    endpoint: String,
}

impl HttpPredictionBackend {
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| BridgeError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PredictionBackend for HttpPredictionBackend {
    async fn predict(&self, review: &PredictionRequest) -> Result<Option<f64>, BridgeError> {
        debug!(target: "sentinel.bridge", endpoint = %self.endpoint, "posting review");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictBody { reviews: [review] })
            .send()
            .await
            .map_err(|err| BridgeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::ServerStatus(status.as_u16()));
        }

        let reply: PredictReply = response
            .json()
            .await
            .map_err(|err| BridgeError::InvalidPayload(err.to_string()))?;

        if let Some(error) = reply.error.filter(|value| is_truthy(value)) {
            let message = match error.as_str() {
                Some(text) => text.to_string(),
                None => error.to_string(),
            };
            return Err(BridgeError::Service(message));
        }

        Ok(reply.scores.first().and_then(serde_json::Value::as_f64))
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::String(text) => !text.is_empty(),
        serde_json::Value::Number(num) => num.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}
