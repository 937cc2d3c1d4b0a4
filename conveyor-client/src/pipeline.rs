//! Pipeline control endpoints

use conveyor_core::domain::state::PipelineState;
use conveyor_core::dto::pipeline::{
    HealthReport, PipelineSnapshot, StartRequest, StartResponse, StopResponse,
};

use crate::ConveyorClient;
use crate::error::{ClientError, Result};

impl ConveyorClient {
    // =============================================================================
    // Pipeline Control
    // =============================================================================

    /// Current pipeline state plus derived fields
    pub async fn status(&self) -> Result<PipelineSnapshot> {
        let url = format!("{}/api/pipeline/status", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Start a run at `start_index`
    ///
    /// Fails with a 409 `already_running` error while a run is active and a
    /// 400 `index_out_of_range` error for an index past the job source.
    pub async fn start(&self, start_index: u64) -> Result<StartResponse> {
        let url = format!("{}/api/pipeline/start", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&StartRequest { start_index })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Request the active run to stop after its current job
    pub async fn stop(&self) -> Result<StopResponse> {
        let url = format!("{}/api/pipeline/stop", self.base_url);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Zero the persisted state; refused while a run is active
    pub async fn reset(&self) -> Result<PipelineState> {
        let url = format!("{}/api/pipeline/reset", self.base_url);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Health report; an unhealthy orchestrator answers 503 with the same body
    pub async fn health(&self) -> Result<HealthReport> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 503 {
            return response.json().await.map_err(|e| {
                ClientError::ParseError(format!("Failed to parse health report: {}", e))
            });
        }

        self.handle_response(response).await
    }
}
