use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "search_scenario=info,scenario_runner=info,elasticsearch=warn";

/// Install the fmt subscriber for the binary. `RUST_LOG` overrides the default filter.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .init();
}

/// Test variant: writes through the test capture and tolerates repeated calls.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with_test_writer()
        .try_init();
}
