//! Job result endpoints

use conveyor_core::dto::result::{ResultPage, ResultQuery, ResultStats};

use crate::ConveyorClient;
use crate::error::Result;

impl ConveyorClient {
    /// One page of job results, newest first
    pub async fn list_results(&self, query: &ResultQuery) -> Result<ResultPage> {
        let url = format!("{}/api/results", self.base_url);
        let response = self.client.get(&url).query(&query_pairs(query)).send().await?;

        self.handle_response(response).await
    }

    /// Aggregate over all stored results
    pub async fn result_stats(&self) -> Result<ResultStats> {
        let url = format!("{}/api/results/stats", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}

fn query_pairs(query: &ResultQuery) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(status) = query.status {
        pairs.push(("status", status.as_str().to_string()));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit", limit.to_string()));
    }
    if let Some(offset) = query.offset {
        pairs.push(("offset", offset.to_string()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use conveyor_core::domain::job::Outcome;

    use super::*;

    #[test]
    fn test_query_pairs_skip_unset_fields() {
        assert!(query_pairs(&ResultQuery::default()).is_empty());

        let pairs = query_pairs(&ResultQuery {
            status: Some(Outcome::Failure),
            limit: Some(20),
            offset: None,
        });
        assert_eq!(
            pairs,
            vec![("status", "failure".to_string()), ("limit", "20".to_string())]
        );
    }
}
