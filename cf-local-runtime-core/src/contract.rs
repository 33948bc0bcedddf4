//! # contract: interfaces to every external collaborator
//!
//! The tool owns no cluster, installer or CI logic of its own. Each external
//! system is reached through one trait defined here:
//!
//! - [`ClusterProvider`]: the local cluster bootstrapper (kind).
//! - [`Kubectl`]: applying manifests to, and reading pods from, a cluster.
//! - [`CodefreshApi`]: the remote Codefresh REST API.
//! - [`Plugin`]: one step of the venona installation.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the mocks are exported behind the
//!   `test-export-mocks` feature so the CLI crate and integration tests can use them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::install::PluginInstallOptions;

/// Boxed error used across the core crate.
pub type CoreError = Box<dyn std::error::Error + Send + Sync>;

/// Values threaded through the installer plugins and used to render manifests.
pub type Values = serde_json::Map<String, serde_json::Value>;

/// Cluster name kind uses when none is given.
pub const DEFAULT_CLUSTER_NAME: &str = "kind";

/// Options for bootstrapping a local cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOptions {
    /// Cluster context name.
    pub name: String,
    /// Path to a kind config file.
    pub config: Option<PathBuf>,
    /// Node docker image used to boot the cluster.
    pub image: Option<String>,
    /// Keep the nodes for debugging when creation fails.
    pub retain: bool,
    /// How long to wait for the control plane node to be ready.
    pub wait: Duration,
    /// Kubeconfig the cluster credentials are merged into.
    pub kubeconfig: Option<PathBuf>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLUSTER_NAME.to_string(),
            config: None,
            image: None,
            retain: false,
            wait: Duration::from_secs(120),
            kubeconfig: None,
        }
    }
}

/// Failure modes of [`ClusterProvider::create`] the caller branches on.
#[derive(Debug)]
pub enum ClusterCreateError {
    /// The kind configuration was rejected; one entry per reported problem.
    InvalidConfig(Vec<String>),
    Failed(CoreError),
}

impl fmt::Display for ClusterCreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(problems) => {
                write!(f, "invalid configuration: {}", problems.join("; "))
            }
            Self::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ClusterCreateError {}

/// Bootstrapper for local Kubernetes clusters.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Whether a cluster with this name already exists.
    async fn is_known(&self, name: &str) -> Result<bool, CoreError>;

    /// Create the cluster and block until it is ready or `opts.wait` elapses.
    async fn create(&self, opts: &ClusterOptions) -> Result<(), ClusterCreateError>;
}

/// Where manifests are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KubeTarget {
    pub kubeconfig: PathBuf,
    pub context: String,
    pub namespace: String,
    /// Use the in-cluster service account instead of a kubeconfig.
    pub in_cluster: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    pub phase: Option<String>,
}

/// The slice of kubectl the installer needs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Kubectl: Send + Sync {
    /// Apply a (multi-document) YAML manifest to the target.
    async fn apply(&self, manifest: &str, target: &KubeTarget) -> Result<(), CoreError>;

    /// List pods in all namespaces of the cluster behind `kubeconfig`.
    async fn list_pods(&self, kubeconfig: &Path) -> Result<Vec<PodSummary>, CoreError>;
}

/// Options for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub metadata: PipelineMetadata,
}

/// Request for registering a runtime environment with Codefresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRuntimeOptions {
    pub cluster: String,
    pub namespace: String,
    pub has_agent: bool,
    pub storage_class: Option<String>,
    pub runner_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEnvironment {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentToken {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub token: String,
}

/// The Codefresh API operations this tool uses.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CodefreshApi: Send + Sync {
    /// Trigger a pipeline run and return the build id.
    async fn run_pipeline(&self, name: &str, opts: &RunOptions) -> Result<String, CoreError>;

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, CoreError>;

    async fn create_runtime_environment(
        &self,
        opts: &CreateRuntimeOptions,
    ) -> Result<RuntimeEnvironment, CoreError>;

    async fn set_default_runtime_environment(&self, name: &str) -> Result<(), CoreError>;

    /// Register an agent serving the given runtime environments.
    async fn create_agent(&self, name: &str, runtimes: &[String]) -> Result<AgentToken, CoreError>;
}

/// One step of the venona installation.
///
/// A plugin receives the values produced by the previous plugins and returns
/// them, possibly extended, for the next one.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn install(
        &self,
        opts: &PluginInstallOptions,
        values: Values,
    ) -> Result<Values, CoreError>;
}
