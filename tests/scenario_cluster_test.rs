//! End-to-end scenario against a real cluster
//!
//! Uses `TESTS_CLUSTER_*` to find a node, or starts one in Docker.
//! Run with: `cargo test --test scenario_cluster_test -- --ignored`

use search_scenario::{telemetry, ClusterConfig, Scenario, ScenarioRunner, SCENARIO_INDEX};
use serde_json::json;
use serial_test::serial;

fn config() -> ClusterConfig {
    ClusterConfig::from_env().expect("invalid TESTS_CLUSTER_* configuration")
}

#[tokio::test]
#[ignore] // Needs a running cluster or Docker
#[serial]
async fn test_a_scenario() {
    telemetry::init_for_tests();

    let outcome = ScenarioRunner::execute(&config(), &Scenario::default())
        .await
        .expect("scenario failed");

    assert_eq!(outcome.total_hits, 1);
}

#[tokio::test]
#[ignore] // Needs a running cluster or Docker
#[serial]
async fn test_scenario_clears_stale_data() {
    telemetry::init_for_tests();
    let mut runner = ScenarioRunner::connect(&config())
        .await
        .expect("failed to connect");

    // Seed the index with documents that the scenario must wipe.
    let result: search_scenario::Result<_> = async {
        let client = runner.client();
        client.delete_index_if_exists(SCENARIO_INDEX).await?;
        client.create_index(SCENARIO_INDEX).await?;
        for n in 0..3 {
            client
                .index_document(SCENARIO_INDEX, &json!({ "stale": n }))
                .await?;
        }
        assert_eq!(client.search_all(SCENARIO_INDEX).await?.total_hits, 3);

        runner.run_scenario(&Scenario::default()).await
    }
    .await;

    runner.teardown().await.expect("teardown failed");
    let outcome = result.expect("scenario failed");
    assert!(outcome.index_deleted);
    assert_eq!(outcome.total_hits, 1);
}

#[tokio::test]
#[ignore] // Needs a running cluster or Docker
#[serial]
async fn test_scenario_is_repeatable() {
    telemetry::init_for_tests();
    let mut runner = ScenarioRunner::connect(&config())
        .await
        .expect("failed to connect");
    let scenario = Scenario::default();

    let first = runner.run_scenario(&scenario).await;
    let second = runner.run_scenario(&scenario).await;
    runner.teardown().await.expect("teardown failed");

    assert_eq!(first.expect("first run failed").total_hits, 1);
    let second = second.expect("second run failed");
    assert!(second.index_deleted);
    assert_eq!(second.total_hits, 1);
}
