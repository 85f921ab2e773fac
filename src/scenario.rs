use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::client::{ClusterClient, ClusterInfo};
use crate::error::{Result, ScenarioError};

pub const SCENARIO_INDEX: &str = "scenario1";

/// Delete, create, index one document, search, check the hit count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub index: String,
    pub document: Value,
    pub expected_hits: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            index: SCENARIO_INDEX.to_string(),
            document: json!({ "foo": "bar" }),
            expected_hits: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub document_id: String,
    pub total_hits: u64,
    pub index_deleted: bool,
    /// Version reported by the liveness call of the cluster the run hit
    pub cluster_version: String,
}

impl Scenario {
    pub async fn run(&self, client: &ClusterClient, cluster: &ClusterInfo) -> Result<ScenarioOutcome> {
        let index = self.index.as_str();

        info!(index, "-> removing index");
        let index_deleted = client.delete_index_if_exists(index).await?;

        info!(index, "-> creating index");
        client.create_index(index).await?;

        info!(index, "-> indexing one document");
        let indexed = client.index_document(index, &self.document).await?;
        info!(index, id = %indexed.id, "-> document indexed");

        let summary = client.search_all(index).await?;
        info!(
            index,
            total_hits = summary.total_hits,
            returned = summary.returned,
            "-> search done"
        );

        if summary.total_hits != self.expected_hits {
            return Err(ScenarioError::UnexpectedHitCount {
                expected: self.expected_hits,
                actual: summary.total_hits,
            });
        }

        Ok(ScenarioOutcome {
            document_id: indexed.id,
            total_hits: summary.total_hits,
            index_deleted,
            cluster_version: cluster.version.number.clone(),
        })
    }
}
