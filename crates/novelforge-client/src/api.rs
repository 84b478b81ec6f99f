//! Authenticated REST client
//!
//! JSON requests against the NovelForge API with bearer-token auth. A 401
//! clears the session (forced logout) so the host can route to sign-in.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::config::ApiConfig;
use crate::error::ClientError;

/// REST client for the CRUD endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        config: ApiConfig,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http,
            config,
            session,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::DELETE, path, None).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.config.endpoint(path);
        debug!(%method, %url, "API request");

        let mut builder = self
            .http
            .request(method, &url)
            .timeout(self.config.timeout);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // Token expired or revoked; force a logout
            warn!("API returned 401, clearing session");
            self.session.clear();
            return Err(ClientError::Unauthorized);
        }

        let data: Value = response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;

        if !status.is_success() {
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Request failed")
                .to_string();
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(data)
    }
}
