//! Configuration module
//!
//! Handles CLI configuration including the orchestrator URL.

use conveyor_client::ConveyorClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
}

impl Config {
    pub fn client(&self) -> ConveyorClient {
        ConveyorClient::new(&self.orchestrator_url)
    }
}
