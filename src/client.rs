use elasticsearch::{
    auth::Credentials,
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{IndicesCreateParts, IndicesDeleteParts},
    params::Refresh,
    Elasticsearch, IndexParts, SearchParts,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::ClusterConfig;
use crate::error::{Result, ScenarioError};

/// Client handle bound to a single cluster endpoint
pub struct ClusterClient {
    client: Elasticsearch,
    endpoint: String,
}

/// Outcome of the liveness call
#[derive(Debug)]
pub enum Probe {
    Reachable(ClusterInfo),
    /// No HTTP response at all (refused, DNS, timeout)
    Unreachable(elasticsearch::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    pub version: VersionInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub result: String,
}

/// `hits.total` is an object since 7.0 and a bare number before that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Object { value: u64 },
    Legacy(u64),
}

impl TotalHits {
    pub fn value(self) -> u64 {
        match self {
            TotalHits::Object { value } | TotalHits::Legacy(value) => value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: InnerHits,
}

#[derive(Debug, Deserialize)]
struct InnerHits {
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub total_hits: u64,
    pub returned: usize,
}

impl ClusterClient {
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        let url = config.url()?;
        let pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(pool);
        if let Some((user, pass)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(user.to_string(), pass.to_string()));
        }
        let transport = builder.build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            endpoint: config.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Liveness call. Transport failures are reported as `Unreachable`
    /// rather than as an error so the caller can fall back to a container.
    pub async fn probe(&self) -> Result<Probe> {
        match self.client.info().send().await {
            Ok(response) => {
                let response = check_status(response, "cluster info").await?;
                Ok(Probe::Reachable(decode(response).await?))
            }
            Err(err) if err.status_code().is_none() => Ok(Probe::Unreachable(err)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn info(&self) -> Result<ClusterInfo> {
        let response = self.client.info().send().await?;
        let response = check_status(response, "cluster info").await?;
        decode(response).await
    }

    /// Returns whether an index was actually removed; a missing index is not an error.
    pub async fn delete_index_if_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            debug!(index, "index did not exist");
            return Ok(false);
        }

        check_status(response, "delete index").await?;
        Ok(true)
    }

    pub async fn create_index(&self, index: &str) -> Result<()> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(json!({}))
            .send()
            .await?;

        check_status(response, "create index").await?;
        Ok(())
    }

    /// Index a document with `refresh=true` so it is searchable on return.
    pub async fn index_document(&self, index: &str, document: &Value) -> Result<IndexedDocument> {
        let response = self
            .client
            .index(IndexParts::Index(index))
            .refresh(Refresh::True)
            .body(document)
            .send()
            .await?;

        let response = check_status(response, "index document").await?;
        decode(response).await
    }

    /// Unfiltered search with exact total hit tracking.
    pub async fn search_all(&self, index: &str) -> Result<SearchSummary> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(json!({
                "query": { "match_all": {} },
                "track_total_hits": true
            }))
            .send()
            .await?;

        let response = check_status(response, "search").await?;
        let body: Value = decode(response).await?;
        debug!(index, response = %body, "search response");

        summarize(body)
    }

    /// Consumes the handle. The `elasticsearch` crate has no explicit close;
    /// dropping the client releases its transport and connection pool.
    pub fn close(self) {
        info!(endpoint = %self.endpoint, "closing Elasticsearch client");
    }
}

fn summarize(body: Value) -> Result<SearchSummary> {
    let parsed: SearchResponse = serde_json::from_value(body)?;
    let returned = parsed.hits.hits.len();
    let total_hits = parsed
        .hits
        .total
        .map(TotalHits::value)
        .unwrap_or(returned as u64);

    Ok(SearchSummary {
        total_hits,
        returned,
    })
}

/// Reads the body first so a malformed payload surfaces as `Serde`, leaving
/// `Transport` for failures on the wire.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

async fn check_status(response: Response, operation: &'static str) -> Result<Response> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ScenarioError::Status {
        operation,
        status,
        body,
    })
}
