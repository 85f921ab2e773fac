//! Scenario runner lifecycle
//!
//! `Uninitialized -> Connecting -> (ContainerStarting ->) Connected ->
//! ScenarioRunning -> TornDown`. Every state may go straight to `TornDown`,
//! and a finished scenario returns the runner to `Connected` so the same
//! handle can run it again.

use elasticsearch::http::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::client::{ClusterClient, ClusterInfo, Probe};
use crate::config::ClusterConfig;
use crate::container::{check_credentials, ClusterContainer};
use crate::error::{Result, ScenarioError};
use crate::scenario::{Scenario, ScenarioOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Uninitialized,
    Connecting,
    ContainerStarting,
    Connected,
    ScenarioRunning,
    TornDown,
}

impl RunnerState {
    pub fn can_transition_to(self, to: RunnerState) -> bool {
        use RunnerState::*;
        match (self, to) {
            (TornDown, _) => false,
            (_, TornDown) => true,
            (Uninitialized, Connecting) => true,
            (Connecting, ContainerStarting | Connected) => true,
            (ContainerStarting, Connected) => true,
            (Connected, ScenarioRunning) => true,
            (ScenarioRunning, Connected) => true,
            _ => false,
        }
    }

    pub fn transition(self, to: RunnerState) -> Result<RunnerState> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(ScenarioError::InvalidTransition { from: self, to })
        }
    }
}

/// Polling schedule used while a freshly started container comes up
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Attempts during which a 401 still counts as "security initialising"
    pub auth_grace_attempts: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            auth_grace_attempts: 5,
        }
    }
}

impl ReadinessConfig {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    fn should_retry(&self, attempt: u32, status: StatusCode) -> bool {
        match status {
            StatusCode::SERVICE_UNAVAILABLE => true,
            StatusCode::UNAUTHORIZED => attempt <= self.auth_grace_attempts,
            _ => false,
        }
    }
}

pub struct ScenarioRunner {
    client: ClusterClient,
    container: Option<ClusterContainer>,
    cluster: ClusterInfo,
    state: RunnerState,
}

impl ScenarioRunner {
    /// Connect to the configured cluster, launching a container when nothing answers.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        Self::connect_with(config, &ReadinessConfig::default()).await
    }

    pub async fn connect_with(config: &ClusterConfig, readiness: &ReadinessConfig) -> Result<Self> {
        Self::connect_or_launch(config, readiness, |config| async move {
            ClusterContainer::start(&config).await
        })
        .await
    }

    async fn connect_or_launch<F, Fut>(
        config: &ClusterConfig,
        readiness: &ReadinessConfig,
        launch: F,
    ) -> Result<Self>
    where
        F: FnOnce(ClusterConfig) -> Fut,
        Fut: Future<Output = Result<ClusterContainer>>,
    {
        let mut state = RunnerState::Uninitialized.transition(RunnerState::Connecting)?;
        info!(endpoint = %config.endpoint(), "starting a client");

        let probe_client = ClusterClient::new(config)?;
        let probe = probe_client.probe().await?;
        let (client, container) = match probe {
            Probe::Reachable(info) => {
                info!(
                    version = %info.version.number,
                    "a node is already running, no container needed"
                );
                (probe_client, None)
            }
            Probe::Unreachable(err) => {
                probe_client.close();
                if !config.bootstrap {
                    return Err(ScenarioError::Unreachable {
                        endpoint: config.endpoint(),
                        reason: format!("{err} (container bootstrap disabled)"),
                    });
                }

                check_credentials(config)?;

                info!(error = %err, "no node running, starting a Docker instance");
                state = state.transition(RunnerState::ContainerStarting)?;
                let container = launch(config.clone()).await?;
                let container_config = config.for_container(container.host(), container.port());

                match wait_until_ready(&container_config, readiness).await {
                    Ok(client) => (client, Some(container)),
                    Err(err) => {
                        if let Err(stop_err) = container.stop().await {
                            warn!(error = %stop_err, "failed to stop container after bootstrap failure");
                        }
                        return Err(err);
                    }
                }
            }
        };

        let cluster = match client.info().await {
            Ok(cluster) => cluster,
            Err(err) => {
                client.close();
                if let Some(container) = container {
                    if let Err(stop_err) = container.stop().await {
                        warn!(error = %stop_err, "failed to stop container after connect failure");
                    }
                }
                return Err(err);
            }
        };
        state = state.transition(RunnerState::Connected)?;
        info!(
            version = %cluster.version.number,
            cluster_name = %cluster.cluster_name,
            "client is running against an Elasticsearch cluster"
        );

        Ok(Self {
            client,
            container,
            cluster,
            state,
        })
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn cluster(&self) -> &ClusterInfo {
        &self.cluster
    }

    pub fn client(&self) -> &ClusterClient {
        &self.client
    }

    pub fn started_container(&self) -> bool {
        self.container.is_some()
    }

    pub async fn run_scenario(&mut self, scenario: &Scenario) -> Result<ScenarioOutcome> {
        self.state = self.state.transition(RunnerState::ScenarioRunning)?;
        let result = scenario.run(&self.client, &self.cluster).await;
        self.state = self.state.transition(RunnerState::Connected)?;

        if let Err(err) = &result {
            error!(index = %scenario.index, error = %err, "scenario failed");
        }
        result
    }

    /// Close the client and stop any container this runner started.
    pub async fn teardown(self) -> Result<()> {
        let Self {
            client,
            container,
            state,
            ..
        } = self;
        state.transition(RunnerState::TornDown)?;

        client.close();
        if let Some(container) = container {
            container.stop().await?;
        }
        Ok(())
    }

    /// Connect, run once, and tear down. The scenario's own result wins over
    /// any teardown failure.
    pub async fn execute(config: &ClusterConfig, scenario: &Scenario) -> Result<ScenarioOutcome> {
        let mut runner = Self::connect(config).await?;
        let result = runner.run_scenario(scenario).await;

        if let Err(err) = runner.teardown().await {
            warn!(error = %err, "teardown failed");
        }
        result
    }
}

/// Poll the liveness call until the node answers. Transport failures and
/// 503 are retried; 401 only during `auth_grace_attempts`.
pub(crate) async fn wait_until_ready(
    config: &ClusterConfig,
    readiness: &ReadinessConfig,
) -> Result<ClusterClient> {
    let client = ClusterClient::new(config)?;

    for attempt in 1..=readiness.max_attempts {
        let delay = readiness.backoff(attempt);
        match client.probe().await {
            Ok(Probe::Reachable(_)) => {
                info!(endpoint = %client.endpoint(), attempt, "container is reachable");
                return Ok(client);
            }
            Ok(Probe::Unreachable(err)) => {
                warn!(
                    attempt,
                    max_attempts = readiness.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "container not reachable yet"
                );
            }
            Err(err)
                if err
                    .status_code()
                    .is_some_and(|status| readiness.should_retry(attempt, status)) =>
            {
                warn!(
                    attempt,
                    max_attempts = readiness.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "container not ready yet"
                );
            }
            Err(err) => return Err(err),
        }
        if attempt < readiness.max_attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(ScenarioError::Unreachable {
        endpoint: config.endpoint(),
        reason: format!(
            "container did not become reachable after {} attempts",
            readiness.max_attempts
        ),
    })
}
