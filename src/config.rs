/// Configuration for the scenario runner
///
/// Loads connection parameters from environment variables, falling back to a
/// plain-HTTP cluster on `localhost:9200`.
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{Result, ScenarioError};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9200;
pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_ELASTICSEARCH_VERSION: &str = "8.15.0";

/// Connection parameters for the target cluster
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster host name or IP
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// `http` or `https`
    pub scheme: String,
    /// Basic auth user
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Image tag used when a container has to be launched
    pub elasticsearch_version: String,
    /// Whether an unreachable cluster may be replaced by a container
    pub bootstrap: bool,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("elasticsearch_version", &self.elasticsearch_version)
            .field("bootstrap", &self.bootstrap)
            .finish()
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            scheme: DEFAULT_SCHEME.to_string(),
            username: None,
            password: None,
            elasticsearch_version: DEFAULT_ELASTICSEARCH_VERSION.to_string(),
            bootstrap: true,
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("TESTS_CLUSTER_HOST")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match lookup("TESTS_CLUSTER_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ScenarioError::Config(format!("TESTS_CLUSTER_PORT is not a valid port: {raw}"))
            })?,
            None => defaults.port,
        };

        let scheme = match lookup("TESTS_CLUSTER_SCHEME") {
            Some(raw) => {
                let scheme = raw.trim().to_ascii_lowercase();
                if scheme != "http" && scheme != "https" {
                    return Err(ScenarioError::Config(format!(
                        "TESTS_CLUSTER_SCHEME must be http or https, got {raw}"
                    )));
                }
                scheme
            }
            None => defaults.scheme,
        };

        let username = lookup("TESTS_CLUSTER_USER").filter(|v| !v.is_empty());
        let password = lookup("TESTS_CLUSTER_PASS").filter(|v| !v.is_empty());

        let elasticsearch_version = lookup("ELASTICSEARCH_VERSION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.elasticsearch_version);

        let bootstrap = match lookup("TESTS_CLUSTER_BOOTSTRAP") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ScenarioError::Config(format!(
                    "TESTS_CLUSTER_BOOTSTRAP must be a boolean, got {raw}"
                ))
            })?,
            None => defaults.bootstrap,
        };

        Ok(Self {
            host,
            port,
            scheme,
            username,
            password,
            elasticsearch_version,
            bootstrap,
        })
    }

    /// Same parameters pointed at another host/port (used after bootstrap)
    pub fn with_endpoint(&self, host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..self.clone()
        }
    }

    /// Parameters for a node launched by [`crate::container::ClusterContainer`].
    /// The container serves plain HTTP whatever scheme was configured.
    pub fn for_container(&self, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            ..self.with_endpoint(host, port)
        }
    }

    /// Basic auth pair, only when both halves are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn url(&self) -> Result<Url> {
        Ok(Url::parse(&self.endpoint())?)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = ClusterConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 9200);
        assert_eq!(config.scheme, "http");
        assert_eq!(config.username, None);
        assert_eq!(config.password, None);
        assert_eq!(config.elasticsearch_version, DEFAULT_ELASTICSEARCH_VERSION);
        assert!(config.bootstrap);
        assert_eq!(config.endpoint(), "http://localhost:9200");
    }

    #[test]
    fn test_overrides() {
        let config = ClusterConfig::from_lookup(lookup_from(&[
            ("TESTS_CLUSTER_HOST", "es.internal"),
            ("TESTS_CLUSTER_PORT", "9243"),
            ("TESTS_CLUSTER_SCHEME", "HTTPS"),
            ("TESTS_CLUSTER_USER", "elastic"),
            ("TESTS_CLUSTER_PASS", "changeme"),
            ("ELASTICSEARCH_VERSION", "7.17.22"),
            ("TESTS_CLUSTER_BOOTSTRAP", "false"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint(), "https://es.internal:9243");
        assert_eq!(config.credentials(), Some(("elastic", "changeme")));
        assert_eq!(config.elasticsearch_version, "7.17.22");
        assert!(!config.bootstrap);
    }

    #[test]
    fn test_credentials_need_both_halves() {
        let config =
            ClusterConfig::from_lookup(lookup_from(&[("TESTS_CLUSTER_USER", "elastic")])).unwrap();
        assert_eq!(config.credentials(), None);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        for pairs in [
            [("TESTS_CLUSTER_PORT", "ninety-two")],
            [("TESTS_CLUSTER_PORT", "70000")],
            [("TESTS_CLUSTER_SCHEME", "ftp")],
            [("TESTS_CLUSTER_BOOTSTRAP", "maybe")],
        ] {
            let err = ClusterConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(matches!(err, ScenarioError::Config(_)), "{pairs:?}: {err}");
        }
    }

    #[test]
    fn test_with_endpoint_keeps_credentials() {
        let config = ClusterConfig {
            username: Some("elastic".into()),
            password: Some("secret".into()),
            ..ClusterConfig::default()
        };
        let moved = config.with_endpoint("127.0.0.1", 32768);

        assert_eq!(moved.endpoint(), "http://127.0.0.1:32768");
        assert_eq!(moved.credentials(), Some(("elastic", "secret")));
        assert_eq!(moved.url().unwrap().port(), Some(32768));
    }

    #[test]
    fn test_container_endpoint_is_plain_http() {
        let config = ClusterConfig {
            scheme: "https".into(),
            username: Some("elastic".into()),
            password: Some("secret".into()),
            ..ClusterConfig::default()
        };
        let container = config.for_container("127.0.0.1", 49153);

        assert_eq!(container.endpoint(), "http://127.0.0.1:49153");
        assert_eq!(container.credentials(), Some(("elastic", "secret")));
        assert_eq!(config.endpoint(), "https://localhost:9200");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ClusterConfig {
            password: Some("hunter2".into()),
            ..ClusterConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
