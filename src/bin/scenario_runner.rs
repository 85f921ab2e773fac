/// Run the index-and-search scenario once against the configured cluster
///
/// Usage:
///   TESTS_CLUSTER_HOST=localhost TESTS_CLUSTER_PORT=9200 cargo run --bin scenario-runner
///
/// Environment variables:
///   - TESTS_CLUSTER_HOST / TESTS_CLUSTER_PORT / TESTS_CLUSTER_SCHEME: endpoint (default http://localhost:9200)
///   - TESTS_CLUSTER_USER / TESTS_CLUSTER_PASS: optional basic auth
///   - ELASTICSEARCH_VERSION: image tag used if a container must be started
///   - TESTS_CLUSTER_BOOTSTRAP: set to false to forbid the Docker fallback
use anyhow::{Context, Result};
use search_scenario::{telemetry, ClusterConfig, Scenario, ScenarioRunner};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let config = ClusterConfig::from_env().context("invalid cluster configuration")?;
    info!(?config, "loaded configuration");

    let scenario = Scenario::default();
    let outcome = ScenarioRunner::execute(&config, &scenario)
        .await
        .with_context(|| format!("scenario on index {} failed", scenario.index))?;

    info!(
        index = %scenario.index,
        document_id = %outcome.document_id,
        total_hits = outcome.total_hits,
        "scenario passed"
    );
    Ok(())
}
