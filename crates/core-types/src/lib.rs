use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the annotation pipeline crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SentinelError {
    #[error("{message}")]
    Message { message: String },
}

impl SentinelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Structural identity of a node in the host page.
///
/// Every created node gets a fresh id, so a node that replaces another one is
/// always a different identity even when its markup is identical.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Lifecycle of one review element. Only ever advances forward.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementStatus {
    #[default]
    Idle,
    Queued,
    Processing,
    Done,
}

impl ElementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementStatus::Idle => "idle",
            ElementStatus::Queued => "queued",
            ElementStatus::Processing => "processing",
            ElementStatus::Done => "done",
        }
    }

    /// The single status that may follow this one, if any.
    pub fn next(self) -> Option<ElementStatus> {
        match self {
            ElementStatus::Idle => Some(ElementStatus::Queued),
            ElementStatus::Queued => Some(ElementStatus::Processing),
            ElementStatus::Processing => Some(ElementStatus::Done),
            ElementStatus::Done => None,
        }
    }

    pub fn can_advance_to(self, target: ElementStatus) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for ElementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One review record sent to the scoring service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub text: String,
    pub rating: f64,
}

impl PredictionRequest {
    /// Builds a request, rejecting empty text. Ratings outside `[1, 5]` fall
    /// back to 5.
    pub fn new(text: impl Into<String>, rating: f64) -> Option<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return None;
        }
        let rating = if rating.is_finite() && (1.0..=5.0).contains(&rating) {
            rating
        } else {
            DEFAULT_RATING
        };
        Some(Self { text, rating })
    }
}

/// Rating assumed when a review carries no discoverable rating.
pub const DEFAULT_RATING: f64 = 5.0;

/// Result of scoring one review: a score or an error, never both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Score { score: f64 },
    Error { error: String },
}

impl PredictionResponse {
    pub fn score(score: f64) -> Self {
        Self::Score { score }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Decodes a loosely shaped reply. An `error` field wins; a reply with
    /// neither field (or a non-numeric score) is read as a zero score.
    pub fn from_value(value: &serde_json::Value) -> Self {
        if let Some(error) = value.get("error").filter(|v| !v.is_null()) {
            let message = match error.as_str() {
                Some(text) => text.to_string(),
                None => error.to_string(),
            };
            return Self::error(message);
        }
        let score = value
            .get("score")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0);
        Self::score(score)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PredictionResponse::Error { .. })
    }

    pub fn score_value(&self) -> Option<f64> {
        match self {
            PredictionResponse::Score { score } => Some(*score),
            PredictionResponse::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PredictionResponse::Error { error } => Some(error),
            PredictionResponse::Score { .. } => None,
        }
    }
}
