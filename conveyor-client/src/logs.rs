//! Pipeline log endpoints

use conveyor_core::domain::log::LogEntry;
use conveyor_core::dto::log::LogList;

use crate::ConveyorClient;
use crate::error::Result;

impl ConveyorClient {
    /// Most recent log entries, newest first
    pub async fn recent_logs(&self, limit: Option<u32>) -> Result<Vec<LogEntry>> {
        let url = format!("{}/api/logs", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let list: LogList = self.handle_response(request.send().await?).await?;
        Ok(list.logs)
    }
}
