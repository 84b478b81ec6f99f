//! User notification surface
//!
//! Boundary for transient toast messages. The core never renders UI; hosts
//! supply an implementation, or [`NoopNotify`] when there is none.

use std::sync::Arc;

use tracing::warn;

use crate::error::ClientError;

/// Message severity, mapped to toast styling by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Renders transient notifications to the user.
pub trait Notify: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Notification sink for hosts without a toast surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotify;

impl Notify for NoopNotify {
    fn notify(&self, _message: &str, _severity: Severity) {}
}

/// Maps client errors to user-facing toasts.
pub struct ErrorReporter {
    notifier: Arc<dyn Notify>,
}

impl ErrorReporter {
    pub fn new(notifier: Arc<dyn Notify>) -> Self {
        Self { notifier }
    }

    /// Report an API failure to the user.
    pub fn report(&self, error: &ClientError) {
        warn!("API error: {error}");
        self.notifier.notify(&error.user_message(), Severity::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotify {
        messages: Mutex<Vec<(String, Severity)>>,
    }

    impl Notify for RecordingNotify {
        fn notify(&self, message: &str, severity: Severity) {
            self.messages.lock().push((message.to_string(), severity));
        }
    }

    #[test]
    fn test_reporter_forwards_user_message() {
        let sink = Arc::new(RecordingNotify::default());
        let reporter = ErrorReporter::new(Arc::clone(&sink) as Arc<dyn Notify>);

        reporter.report(&ClientError::Unauthorized);

        assert_eq!(
            *sink.messages.lock(),
            vec![("Please sign in first".to_string(), Severity::Error)]
        );
    }

    #[test]
    fn test_noop_notify_is_a_valid_sink() {
        let reporter = ErrorReporter::new(Arc::new(NoopNotify));
        reporter.report(&ClientError::Network("connection refused".to_string()));
    }
}
