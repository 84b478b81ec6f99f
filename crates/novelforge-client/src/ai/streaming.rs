//! Streaming types for AI generation
//!
//! Typed events decoded from the generation endpoints' event streams.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Events delivered over a generation stream.
///
/// At most one terminal event (`Complete` or `Error`) is delivered per
/// stream; nothing follows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Incremental generated text
    #[serde(rename = "chunk")]
    Chunk { text: String },

    /// Terminal success, with whatever metadata the server attached
    #[serde(rename = "complete")]
    Complete { metadata: Option<Value> },

    /// Terminal failure
    #[serde(rename = "error")]
    Error { message: String },

    /// Non-terminal status update
    #[serde(rename = "progress")]
    Progress(Progress),
}

/// Progress report attached to `progress` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub percent: f64,
    pub message: String,
}

/// Terminal stream failure, delivered through `on_error` callbacks.
///
/// Covers both transport failures and explicit server-side `error` events;
/// callers cannot and need not distinguish the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct StreamError {
    pub message: String,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
