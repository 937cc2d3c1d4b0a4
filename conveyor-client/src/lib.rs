//! Conveyor HTTP Client
//!
//! A small, type-safe client for the Conveyor orchestrator's control API.
//!
//! # Example
//!
//! ```no_run
//! use conveyor_client::ConveyorClient;
//!
//! #[tokio::main]
//! async fn main() -> conveyor_client::Result<()> {
//!     let client = ConveyorClient::new("http://localhost:5000");
//!
//!     let accepted = client.start(0).await?;
//!     println!("Started run {} over {} jobs", accepted.run_id, accepted.job_count);
//!     Ok(())
//! }
//! ```

pub mod error;
mod logs;
mod pipeline;
mod results;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Conveyor orchestrator API
///
/// Methods are grouped by endpoint family:
/// - Pipeline control (status, start, stop, reset, health)
/// - Job results (listing, statistics)
/// - Pipeline logs
#[derive(Debug, Clone)]
pub struct ConveyorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:5000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ConveyorClient {
    /// Create a new client for the orchestrator at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Checks the status code and deserializes the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Request failed with {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
