//! Stream session management
//!
//! Wraps the transport with the four named generation operations, a
//! consolidated observable state and at-most-one-active-stream semantics.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::SessionStore;
use crate::config::ApiConfig;

use super::requests::{ChatRequest, ContinueRequest, PolishRequest, RewriteRequest};
use super::streaming::{Progress, StreamError};
use super::transport::{StreamCallbacks, StreamEndpoint, StreamRequest, StreamTransport};

/// Consolidated state of the current (or last) generation stream.
///
/// Observers receive immutable snapshots; only the owning session mutates
/// the live value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub is_streaming: bool,
    /// Accumulated text; append-only within one stream and kept after an
    /// error, so partial output stays usable
    pub content: String,
    pub error: Option<StreamError>,
    pub progress: Option<Progress>,
    pub metadata: Option<Value>,
}

/// Caller hooks observed by a [`StreamSession`]. Each is optional.
#[derive(Default)]
pub struct StreamSessionOptions {
    /// Invoked per chunk with the new fragment and the full accumulated text
    pub on_chunk: Option<Box<dyn Fn(&str, &str) + Send + Sync>>,
    /// Invoked once on terminal success with the final text and metadata
    pub on_complete: Option<Box<dyn Fn(&str, Option<&Value>) + Send + Sync>>,
    pub on_error: Option<Box<dyn Fn(&StreamError) + Send + Sync>>,
    pub on_progress: Option<Box<dyn Fn(&Progress) + Send + Sync>>,
    /// Invoked with a full snapshot after every state change
    pub on_state_change: Option<Box<dyn Fn(SessionState) + Send + Sync>>,
}

impl StreamSessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_chunk(mut self, hook: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_chunk = Some(Box::new(hook));
        self
    }

    pub fn on_complete(
        mut self,
        hook: impl Fn(&str, Option<&Value>) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn on_progress(mut self, hook: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(hook));
        self
    }

    pub fn on_state_change(mut self, hook: impl Fn(SessionState) + Send + Sync + 'static) -> Self {
        self.on_state_change = Some(Box::new(hook));
        self
    }
}

struct SessionInner {
    state: SessionState,
    current: Option<Arc<StreamTransport>>,
    /// Bumped whenever a stream starts or stops; stale callbacks compare
    /// their own number against it and drop out
    stream_seq: u64,
}

/// Client for the streaming generation endpoints.
///
/// Owns at most one active stream. Starting a new operation supersedes the
/// previous one: its transport is cancelled and its late callbacks are
/// ignored, so a slow stale stream can never write into a newer session's
/// state.
pub struct StreamSession {
    http: reqwest::Client,
    config: ApiConfig,
    session_store: Option<Arc<dyn SessionStore>>,
    options: Arc<StreamSessionOptions>,
    inner: Arc<Mutex<SessionInner>>,
}

impl StreamSession {
    pub fn new(http: reqwest::Client, config: ApiConfig, options: StreamSessionOptions) -> Self {
        Self {
            http,
            config,
            session_store: None,
            options: Arc::new(options),
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::default(),
                current: None,
                stream_seq: 0,
            })),
        }
    }

    /// Attach the session store whose token authenticates stream requests.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Continue writing from the given context.
    pub async fn continue_write(&self, request: &ContinueRequest) {
        self.start_stream(StreamEndpoint::Continue, to_body(request))
            .await;
    }

    /// Polish existing prose.
    pub async fn polish(&self, request: &PolishRequest) {
        self.start_stream(StreamEndpoint::Polish, to_body(request))
            .await;
    }

    /// Rewrite a passage under an instruction.
    pub async fn rewrite(&self, request: &RewriteRequest) {
        self.start_stream(StreamEndpoint::Rewrite, to_body(request))
            .await;
    }

    /// Converse with an agent.
    pub async fn chat(&self, request: &ChatRequest) {
        self.start_stream(StreamEndpoint::Chat, to_body(request))
            .await;
    }

    /// Start a stream against `endpoint`, superseding any active one.
    ///
    /// Resolves when the stream reaches a terminal event, its natural end,
    /// or is aborted or superseded; UI callers typically spawn it.
    pub async fn start_stream(&self, endpoint: StreamEndpoint, body: Value) {
        let (transport, seq) = {
            let mut inner = self.inner.lock();
            if let Some(previous) = inner.current.take() {
                debug!("superseding active stream");
                previous.cancel();
            }
            inner.stream_seq += 1;
            inner.state = SessionState {
                is_streaming: true,
                ..SessionState::default()
            };
            let transport = Arc::new(StreamTransport::new());
            inner.current = Some(Arc::clone(&transport));
            (transport, inner.stream_seq)
        };
        // Publish the reset state before any network activity
        self.publish();

        let mut request = StreamRequest::post(
            self.config.endpoint(endpoint.path()),
            body,
            self.wire_callbacks(seq),
        );
        if let Some(token) = self.session_store.as_ref().and_then(|store| store.token()) {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        info!(endpoint = endpoint.path(), "starting generation stream");
        transport.start(&self.http, request).await;
    }

    /// Stop the active stream, if any.
    ///
    /// An explicit stop is not an error: accumulated content, error and
    /// metadata are left untouched, only `is_streaming` drops.
    pub fn abort(&self) {
        {
            let mut inner = self.inner.lock();
            if let Some(transport) = inner.current.take() {
                info!("generation stream aborted");
                transport.cancel();
            }
            inner.stream_seq += 1;
            inner.state.is_streaming = false;
        }
        self.publish();
    }

    /// Clear all state back to its zero value.
    ///
    /// Resetting mid-stream aborts the stream first, so a late callback can
    /// never repopulate the cleared state.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock();
            if let Some(transport) = inner.current.take() {
                transport.cancel();
            }
            inner.stream_seq += 1;
            inner.state = SessionState::default();
        }
        self.publish();
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.lock().state.is_streaming
    }

    pub fn content(&self) -> String {
        self.inner.lock().state.content.clone()
    }

    pub fn error(&self) -> Option<StreamError> {
        self.inner.lock().state.error.clone()
    }

    /// Notify the observer with a fresh snapshot, outside the lock.
    fn publish(&self) {
        let snapshot = self.inner.lock().state.clone();
        if let Some(hook) = &self.options.on_state_change {
            hook(snapshot);
        }
    }

    /// Build transport callbacks that fold events into this session's state.
    ///
    /// Every callback re-checks `seq` under the lock before touching state:
    /// once a newer stream (or an abort) has bumped the sequence, a late
    /// event from this stream is dropped on the floor.
    fn wire_callbacks(&self, seq: u64) -> StreamCallbacks {
        let chunk = {
            let inner = Arc::clone(&self.inner);
            let options = Arc::clone(&self.options);
            move |text: &str| {
                let snapshot = {
                    let mut inner = inner.lock();
                    if inner.stream_seq != seq {
                        return;
                    }
                    inner.state.content.push_str(text);
                    inner.state.clone()
                };
                if let Some(hook) = &options.on_state_change {
                    hook(snapshot.clone());
                }
                if let Some(hook) = &options.on_chunk {
                    hook(text, &snapshot.content);
                }
            }
        };

        let complete = {
            let inner = Arc::clone(&self.inner);
            let options = Arc::clone(&self.options);
            move |metadata: Option<&Value>| {
                let snapshot = {
                    let mut inner = inner.lock();
                    if inner.stream_seq != seq {
                        return;
                    }
                    inner.state.is_streaming = false;
                    inner.state.metadata = metadata.cloned();
                    inner.current = None;
                    inner.state.clone()
                };
                if let Some(hook) = &options.on_state_change {
                    hook(snapshot.clone());
                }
                if let Some(hook) = &options.on_complete {
                    hook(&snapshot.content, snapshot.metadata.as_ref());
                }
            }
        };

        let error = {
            let inner = Arc::clone(&self.inner);
            let options = Arc::clone(&self.options);
            move |error: &StreamError| {
                let snapshot = {
                    let mut inner = inner.lock();
                    if inner.stream_seq != seq {
                        return;
                    }
                    inner.state.is_streaming = false;
                    inner.state.error = Some(error.clone());
                    inner.current = None;
                    inner.state.clone()
                };
                if let Some(hook) = &options.on_state_change {
                    hook(snapshot);
                }
                if let Some(hook) = &options.on_error {
                    hook(error);
                }
            }
        };

        let progress = {
            let inner = Arc::clone(&self.inner);
            let options = Arc::clone(&self.options);
            move |progress: &Progress| {
                let snapshot = {
                    let mut inner = inner.lock();
                    if inner.stream_seq != seq {
                        return;
                    }
                    inner.state.progress = Some(progress.clone());
                    inner.state.clone()
                };
                if let Some(hook) = &options.on_state_change {
                    hook(snapshot);
                }
                if let Some(hook) = &options.on_progress {
                    hook(progress);
                }
            }
        };

        StreamCallbacks::new()
            .on_chunk(chunk)
            .on_complete(complete)
            .on_error(error)
            .on_progress(progress)
    }
}

fn to_body<T: Serialize>(request: &T) -> Value {
    serde_json::to_value(request).unwrap_or_default()
}
