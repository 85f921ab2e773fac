//! Disposable Elasticsearch node launched through testcontainers
//!
//! Used only when nothing answers at the configured endpoint. The container
//! is removed when [`ClusterContainer::stop`] runs or, failing that, when the
//! handle is dropped.

use testcontainers::core::WaitFor;
use testcontainers::{runners::AsyncRunner, ContainerAsync, GenericImage};
use tracing::info;

use crate::config::ClusterConfig;
use crate::error::{Result, ScenarioError};

pub const ELASTICSEARCH_IMAGE: &str = "docker.elastic.co/elasticsearch/elasticsearch";
pub const ELASTICSEARCH_HTTP_PORT: u16 = 9200;
/// The only account `ELASTIC_PASSWORD` provisions in the official image.
pub const BUILTIN_SUPERUSER: &str = "elastic";

pub struct ClusterContainer {
    container: Option<ContainerAsync<GenericImage>>,
    host: String,
    port: u16,
    version: String,
}

impl ClusterContainer {
    /// Start a single-node cluster for `config.elasticsearch_version`
    pub async fn start(config: &ClusterConfig) -> Result<Self> {
        check_credentials(config)?;

        let version = config.elasticsearch_version.clone();
        info!(image = ELASTICSEARCH_IMAGE, %version, "starting Elasticsearch container");

        let container = image_for(config)
            .start()
            .await
            .map_err(|e| ScenarioError::Container(format!("failed to start container: {e}")))?;

        let port = container
            .get_host_port_ipv4(ELASTICSEARCH_HTTP_PORT)
            .await
            .map_err(|e| ScenarioError::Container(format!("failed to resolve mapped port: {e}")))?;
        let host = container
            .get_host()
            .await
            .map_err(|e| ScenarioError::Container(format!("failed to resolve host: {e}")))?
            .to_string();

        info!(%host, port, "Elasticsearch container started");

        Ok(Self {
            container: Some(container),
            host,
            port,
            version,
        })
    }

    /// Handle for a node some other process owns; `stop` leaves it running.
    #[cfg(test)]
    pub(crate) fn detached(host: impl Into<String>, port: u16, version: impl Into<String>) -> Self {
        Self {
            container: None,
            host: host.into(),
            port,
            version: version.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn stop(self) -> Result<()> {
        let Some(container) = self.container else {
            return Ok(());
        };

        info!(host = %self.host, port = self.port, "stopping Elasticsearch container");
        container
            .rm()
            .await
            .map_err(|e| ScenarioError::Container(format!("failed to remove container: {e}")))
    }
}

/// A launched node only knows the built-in superuser, so any other
/// configured user could never authenticate against it.
pub fn check_credentials(config: &ClusterConfig) -> Result<()> {
    match config.credentials() {
        Some((user, _)) if user != BUILTIN_SUPERUSER => Err(ScenarioError::Config(format!(
            "container bootstrap only provisions the `{BUILTIN_SUPERUSER}` user, \
             TESTS_CLUSTER_USER is `{user}`"
        ))),
        _ => Ok(()),
    }
}

fn image_for(config: &ClusterConfig) -> GenericImage {
    let image = GenericImage::new(ELASTICSEARCH_IMAGE, config.elasticsearch_version.as_str())
        .with_exposed_port(ELASTICSEARCH_HTTP_PORT)
        .with_wait_for(WaitFor::message_on_stdout("started"))
        .with_env_var("discovery.type", "single-node")
        .with_env_var("ES_JAVA_OPTS", "-Xms512m -Xmx512m");

    match config.credentials() {
        Some((_, password)) => image
            .with_env_var("xpack.security.enabled", "true")
            .with_env_var("xpack.security.http.ssl.enabled", "false")
            .with_env_var("ELASTIC_PASSWORD", password),
        None => image.with_env_var("xpack.security.enabled", "false"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superuser_or_no_credentials_can_bootstrap() {
        assert!(check_credentials(&ClusterConfig::default()).is_ok());

        let config = ClusterConfig {
            username: Some("elastic".into()),
            password: Some("changeme".into()),
            ..ClusterConfig::default()
        };
        assert!(check_credentials(&config).is_ok());
    }

    #[test]
    fn other_users_cannot_bootstrap() {
        let config = ClusterConfig {
            username: Some("admin".into()),
            password: Some("changeme".into()),
            ..ClusterConfig::default()
        };
        let err = check_credentials(&config).unwrap_err();
        assert!(matches!(err, ScenarioError::Config(_)), "{err}");
        assert!(err.to_string().contains("admin"));
    }

    #[tokio::test]
    async fn stopping_a_detached_handle_is_a_no_op() {
        let handle = ClusterContainer::detached("127.0.0.1", 9200, "8.15.0");
        assert_eq!(handle.version(), "8.15.0");
        handle.stop().await.unwrap();
    }
}
