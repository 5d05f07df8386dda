//! Health check operations.

use serde::{Deserialize, Serialize};

use super::StockroomClient;
use crate::error::Result;

/// Body of `GET /ping`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Pong {
    pub message: String,
}

impl StockroomClient {
    /// Check that the server is up.
    pub async fn ping(&self) -> Result<Pong> {
        let response = self.client.get(self.url("/ping")).send().await?;
        self.handle_response(response, "ping").await
    }
}
