//! HTTP client for the stockroom API.

pub mod health;
pub mod loadtest;
pub mod records;

use serde::Deserialize;

use stockroom_core::record::UpsertOutput;

use crate::error::{ClientError, Result};

/// HTTP client for the stockroom API.
#[derive(Debug, Clone)]
pub struct StockroomClient {
    client: reqwest::Client,
    base_url: String,
}

/// Error body returned by the server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    outputs: Vec<UpsertOutput>,
}

impl StockroomClient {
    /// Create a new client with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from environment (STOCKROOM_URL or default).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("STOCKROOM_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        Self::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-success response into a [`ClientError`].
    async fn error_from(response: reqwest::Response, resource: &str) -> ClientError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let body = serde_json::from_str::<ErrorBody>(&text).ok();

        match body {
            Some(body) if !body.outputs.is_empty() => ClientError::UpsertFailed {
                outputs: body.outputs,
            },
            _ if status == 404 => ClientError::NotFound {
                resource: resource.to_string(),
            },
            Some(body) => ClientError::ServerError {
                status,
                message: body.error,
            },
            None => ClientError::ServerError {
                status,
                message: text,
            },
        }
    }

    /// Handle JSON responses.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T> {
        if response.status().is_success() {
            response.json().await.map_err(ClientError::from)
        } else {
            Err(Self::error_from(response, resource).await)
        }
    }

    /// Handle responses without a body.
    async fn handle_empty_response(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response, resource).await)
        }
    }
}
