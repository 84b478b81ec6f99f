//! Request bodies for the generation endpoints
//!
//! Shapes the payloads of the four named operations. Fields the server
//! treats as operation-specific pass through opaquely via `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body for the continue-writing operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContinueRequest {
    pub project_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<i64>,
    /// Text preceding the insertion point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Target length in characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    /// Operation-specific fields passed through unmodified
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body for the polish operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PolishRequest {
    pub project_id: i64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polish_type: Option<PolishType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What aspect of the prose to polish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolishType {
    Grammar,
    Style,
    Clarity,
    All,
}

/// Body for the rewrite operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteRequest {
    pub project_id: i64,
    pub content: String,
    /// What to change, in the author's words
    pub instruction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body for the chat operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ChatMessage>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One prior turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}
