//! API configuration
//!
//! Connection settings shared by the REST client and the stream session.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Where and how to reach the NovelForge backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: Url,
    /// Applies to REST calls only; streams run until terminal or abort
    pub timeout: Duration,
}

impl ApiConfig {
    /// Build a config for the given API base URL, e.g.
    /// `http://localhost:8080/api/v1`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base =
            Url::parse(base_url).map_err(|err| ClientError::InvalidBaseUrl(err.to_string()))?;
        // Endpoint joining relies on the trailing slash
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            base_url: base,
            timeout: Duration::from_secs(30),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL for an endpoint path relative to the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL).expect("default base URL is valid")
    }
}
