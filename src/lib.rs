//! Runs an index-and-search scenario against an Elasticsearch cluster
//!
//! The runner probes the configured endpoint and falls back to a disposable
//! Docker node when nothing answers. It then deletes and recreates the
//! scenario index, indexes one document with an immediate refresh, and checks
//! that an unfiltered search sees exactly that document.
//!
//! ```rust,no_run
//! use search_scenario::{ClusterConfig, Scenario, ScenarioRunner};
//!
//! #[tokio::main]
//! async fn main() -> search_scenario::Result<()> {
//!     let config = ClusterConfig::from_env()?;
//!     let outcome = ScenarioRunner::execute(&config, &Scenario::default()).await?;
//!     assert_eq!(outcome.total_hits, 1);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod container;
pub mod error;
pub mod runner;
pub mod scenario;
pub mod telemetry;

pub use client::{ClusterClient, ClusterInfo, Probe, SearchSummary, TotalHits};
pub use config::ClusterConfig;
pub use container::ClusterContainer;
pub use error::{Result, ScenarioError};
pub use runner::{ReadinessConfig, RunnerState, ScenarioRunner};
pub use scenario::{Scenario, ScenarioOutcome, SCENARIO_INDEX};
