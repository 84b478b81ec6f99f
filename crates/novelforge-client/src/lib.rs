//! NovelForge client core
//!
//! The non-UI heart of the NovelForge writing app: an authenticated REST
//! client for the CRUD endpoints and a streaming client for the AI
//! generation endpoints (continue / polish / rewrite / chat).
//!
//! The streaming side is layered leaf-first: [`ai::sse`] decodes raw bytes
//! into event records, [`ai::transport`] turns one HTTP request into a
//! cancellable sequence of typed events, and [`ai::session`] wraps that in
//! the four named operations with consolidated observable state.
//!
//! Hosts inject their own collaborators at construction: a [`SessionStore`]
//! for token persistence and a [`Notify`] sink for user-facing toasts.

pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;

pub use ai::{
    ChatMessage, ChatRequest, ContinueRequest, PolishRequest, PolishType, Progress,
    RewriteRequest, SessionState, StreamCallbacks, StreamEndpoint, StreamError, StreamEvent,
    StreamRequest, StreamSession, StreamSessionOptions, StreamTransport,
};
pub use api::ApiClient;
pub use auth::{MemorySessionStore, SessionStore, UserInfo};
pub use config::{ApiConfig, DEFAULT_BASE_URL};
pub use error::ClientError;
pub use notify::{ErrorReporter, NoopNotify, Notify, Severity};
