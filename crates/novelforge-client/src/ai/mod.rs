//! AI generation client
//!
//! Streaming transport and session management for the generation endpoints.

pub mod requests;
pub mod session;
pub mod sse;
pub mod streaming;
pub mod transport;

#[cfg(test)]
pub(crate) mod testserver;

pub use requests::{
    ChatMessage, ChatRequest, ContinueRequest, PolishRequest, PolishType, RewriteRequest,
};
pub use session::{SessionState, StreamSession, StreamSessionOptions};
pub use streaming::{Progress, StreamError, StreamEvent};
pub use transport::{StreamCallbacks, StreamEndpoint, StreamRequest, StreamTransport};
