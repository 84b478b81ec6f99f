//! Streaming transport for generation requests
//!
//! Performs one cancellable streaming POST at a time and dispatches decoded
//! events through caller-supplied callbacks.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sse::{SseDecoder, SseRecord};
use super::streaming::{Progress, StreamError, StreamEvent};

/// Streaming endpoints exposed by the generation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEndpoint {
    /// Continue writing from the current chapter context
    Continue,
    /// Polish existing prose
    Polish,
    /// Rewrite a passage under an instruction
    Rewrite,
    /// Free-form conversation with an agent
    Chat,
}

impl StreamEndpoint {
    /// Path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            StreamEndpoint::Continue => "ai/stream/continue",
            StreamEndpoint::Polish => "ai/stream/polish",
            StreamEndpoint::Rewrite => "ai/stream/rewrite",
            StreamEndpoint::Chat => "ai/stream/chat",
        }
    }
}

/// Callback set invoked as stream events arrive. Each is optional.
#[derive(Default)]
pub struct StreamCallbacks {
    pub on_chunk: Option<Box<dyn Fn(&str) + Send + Sync>>,
    pub on_complete: Option<Box<dyn Fn(Option<&Value>) + Send + Sync>>,
    pub on_error: Option<Box<dyn Fn(&StreamError) + Send + Sync>>,
    pub on_progress: Option<Box<dyn Fn(&Progress) + Send + Sync>>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_chunk(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_chunk = Some(Box::new(callback));
        self
    }

    pub fn on_complete(
        mut self,
        callback: impl Fn(Option<&Value>) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

/// Immutable descriptor for one streaming request.
pub struct StreamRequest {
    /// Fully-resolved endpoint URL
    pub url: String,
    /// HTTP method (POST for every generation endpoint)
    pub method: Method,
    /// JSON request body
    pub body: Option<Value>,
    /// Extra headers beyond the defaults
    pub headers: Vec<(String, String)>,
    /// Per-event callbacks
    pub callbacks: StreamCallbacks,
}

impl StreamRequest {
    /// POST request with a JSON body.
    pub fn post(url: impl Into<String>, body: Value, callbacks: StreamCallbacks) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            body: Some(body),
            headers: Vec::new(),
            callbacks,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

struct ActiveStream {
    id: u64,
    token: CancellationToken,
}

/// Performs one streaming network request at a time.
///
/// `start` owns the connection until a terminal event, natural end of stream
/// or an explicit [`cancel`](Self::cancel); every failure is reported
/// through the request's `on_error` callback, never as a return value.
/// Deliberate cancellation is suppressed entirely and is not a failure.
pub struct StreamTransport {
    active: Mutex<Option<ActiveStream>>,
    next_id: AtomicU64,
}

impl StreamTransport {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// True strictly between a `start` and its terminal event, natural end
    /// or cancellation.
    pub fn is_connected(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Abort the in-flight request, if any. Idempotent; never surfaces as an
    /// error to callbacks.
    pub fn cancel(&self) {
        if let Some(stream) = self.active.lock().take() {
            debug!("stream transport cancelled");
            stream.token.cancel();
        }
    }

    /// Run one streaming request to completion, dispatching events as they
    /// decode. A transport already connected supersedes itself first.
    pub async fn start(&self, http: &reqwest::Client, request: StreamRequest) {
        self.cancel();

        let token = CancellationToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.active.lock() = Some(ActiveStream {
            id,
            token: token.clone(),
        });

        info!(url = %request.url, "starting event stream");
        if let Err(error) = self.run(http, &request, &token, id).await {
            // A cancelled token means either a deliberate abort or a terminal
            // event that already self-cancelled; neither is a failure
            if !token.is_cancelled() {
                warn!("event stream failed: {error}");
                if let Some(callback) = &request.callbacks.on_error {
                    callback(&error);
                }
            }
        }
        self.finish(id);
    }

    async fn run(
        &self,
        http: &reqwest::Client,
        request: &StreamRequest,
        token: &CancellationToken,
        id: u64,
    ) -> Result<(), StreamError> {
        let mut builder = http
            .request(request.method.clone(), &request.url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            response = builder.send() => {
                response.map_err(|err| StreamError::new(format!("network error: {err}")))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::new(format!(
                "HTTP error: status {}",
                status.as_u16()
            )));
        }

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        loop {
            let chunk = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                // Natural end of stream without a terminal event
                debug!("event stream ended");
                break;
            };
            let bytes =
                chunk.map_err(|err| StreamError::new(format!("stream read error: {err}")))?;
            for record in decoder.feed(bytes) {
                if token.is_cancelled() {
                    return Ok(());
                }
                let Some(event) = decode_event(&record) else {
                    continue;
                };
                if dispatch(event, &request.callbacks) == Dispatch::Terminal {
                    // Release the connection; any remaining bytes are dropped
                    token.cancel();
                    self.finish(id);
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Drop the active handle, but only if it still belongs to stream `id` -
    /// a superseding `start` installs its own.
    fn finish(&self, id: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|stream| stream.id == id) {
            *active = None;
        }
    }
}

impl Default for StreamTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a wire record to a stream event, per the generation protocol.
fn decode_event(record: &SseRecord) -> Option<StreamEvent> {
    match record.event.as_deref() {
        Some("chunk" | "message") => {
            if let Some(content) = record.data.get("content").and_then(Value::as_str) {
                Some(StreamEvent::Chunk {
                    text: content.to_string(),
                })
            } else if let Value::String(text) = &record.data {
                Some(StreamEvent::Chunk { text: text.clone() })
            } else {
                None
            }
        }
        Some("complete") => {
            let metadata = (!record.data.is_null()).then(|| record.data.clone());
            Some(StreamEvent::Complete { metadata })
        }
        Some("error") => {
            let message = record
                .data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            Some(StreamEvent::Error { message })
        }
        Some("progress") => match serde_json::from_value::<Progress>(record.data.clone()) {
            Ok(progress) => Some(StreamEvent::Progress(progress)),
            Err(_) => {
                warn!("unrecognized progress payload");
                None
            }
        },
        // Unknown event names are ignored
        _ => None,
    }
}

#[derive(PartialEq)]
enum Dispatch {
    Continue,
    Terminal,
}

fn dispatch(event: StreamEvent, callbacks: &StreamCallbacks) -> Dispatch {
    match event {
        StreamEvent::Chunk { text } => {
            debug!("chunk: {} chars", text.len());
            if let Some(callback) = &callbacks.on_chunk {
                callback(&text);
            }
            Dispatch::Continue
        }
        StreamEvent::Complete { metadata } => {
            info!("event stream complete");
            if let Some(callback) = &callbacks.on_complete {
                callback(metadata.as_ref());
            }
            Dispatch::Terminal
        }
        StreamEvent::Error { message } => {
            warn!("event stream reported an error: {message}");
            if let Some(callback) = &callbacks.on_error {
                callback(&StreamError::new(message));
            }
            Dispatch::Terminal
        }
        StreamEvent::Progress(progress) => {
            if let Some(callback) = &callbacks.on_progress {
                callback(&progress);
            }
            Dispatch::Continue
        }
    }
}
