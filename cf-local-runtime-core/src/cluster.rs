//! Local cluster bootstrap on top of the `kind` binary.
//!
//! [`create_cluster`] sequences the provider calls and shapes their errors;
//! [`KindCluster`] is the provider used by the CLI.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::{ClusterCreateError, ClusterOptions, ClusterProvider, CoreError, Kubectl};

/// A cluster that was created and is ready for use.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedCluster {
    pub name: String,
    pub kubeconfig: Option<PathBuf>,
}

/// Create a cluster unless one with the same name already exists.
pub async fn create_cluster<P>(
    opts: &ClusterOptions,
    provider: &P,
) -> Result<CreatedCluster, CoreError>
where
    P: ClusterProvider + ?Sized,
{
    let known = provider.is_known(&opts.name).await?;
    if known {
        return Err(format!("a cluster with the name {:?} already exists", opts.name).into());
    }

    info!(cluster = %opts.name, "Creating cluster {:?} ...", opts.name);
    match provider.create(opts).await {
        Ok(()) => {
            info!(cluster = %opts.name, "Cluster created");
            Ok(CreatedCluster {
                name: opts.name.clone(),
                kubeconfig: opts.kubeconfig.clone(),
            })
        }
        Err(ClusterCreateError::InvalidConfig(problems)) => {
            for problem in &problems {
                error!(cluster = %opts.name, "{}", problem);
            }
            Err("aborting due to invalid configuration".into())
        }
        Err(ClusterCreateError::Failed(e)) => {
            error!(cluster = %opts.name, error = %e, "Cluster creation failed");
            Err(format!("failed to create cluster: {}", e).into())
        }
    }
}

/// Log how many pods the freshly created cluster runs.
pub async fn report_pods<K>(kubectl: &K, kubeconfig: &Path) -> Result<usize, CoreError>
where
    K: Kubectl + ?Sized,
{
    let pods = kubectl.list_pods(kubeconfig).await?;
    info!(count = pods.len(), "There are {} pods in the cluster", pods.len());
    for pod in &pods {
        debug!(
            pod = %pod.name,
            namespace = %pod.namespace,
            phase = pod.phase.as_deref().unwrap_or("Unknown"),
            "Pod"
        );
    }
    Ok(pods.len())
}

/// [`ClusterProvider`] backed by the `kind` command line.
pub struct KindCluster {
    binary: PathBuf,
}

impl KindCluster {
    pub fn new() -> Self {
        Self::with_binary("kind")
    }

    pub fn with_binary<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for KindCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for `kind create cluster`.
pub fn create_args(opts: &ClusterOptions) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "cluster".to_string(),
        "--name".to_string(),
        opts.name.clone(),
    ];
    if let Some(config) = &opts.config {
        args.push("--config".to_string());
        args.push(config.display().to_string());
    }
    if let Some(image) = &opts.image {
        args.push("--image".to_string());
        args.push(image.clone());
    }
    if opts.retain {
        args.push("--retain".to_string());
    }
    args.push("--wait".to_string());
    args.push(format!("{}s", opts.wait.as_secs()));
    if let Some(kubeconfig) = &opts.kubeconfig {
        args.push("--kubeconfig".to_string());
        args.push(kubeconfig.display().to_string());
    }
    args
}

const CONFIG_ERROR_PATTERN: &str =
    r"(?i)(invalid (kind )?config|unable to (load|decode) config|error validating)";

/// Split kind's stderr into configuration problems, if that is what it reports.
///
/// Only `ERROR:` lines and lines naming the config failure are kept; progress
/// output kind writes to stderr is dropped.
pub fn config_problems(stderr: &str) -> Option<Vec<String>> {
    let re = Regex::new(CONFIG_ERROR_PATTERN).ok()?;
    if !re.is_match(stderr) {
        return None;
    }
    Some(
        stderr
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("ERROR:") || re.is_match(l))
            .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
    )
}

#[async_trait]
impl ClusterProvider for KindCluster {
    async fn is_known(&self, name: &str) -> Result<bool, CoreError> {
        let output = Command::new(&self.binary)
            .args(["get", "clusters"])
            .output()
            .await
            .map_err(|e| format!("failed to launch {}: {}", self.binary.display(), e))?;
        if !output.status.success() {
            return Err(format!(
                "kind get clusters exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|l| l.trim() == name))
    }

    async fn create(&self, opts: &ClusterOptions) -> Result<(), ClusterCreateError> {
        let args = create_args(opts);
        debug!(binary = %self.binary.display(), ?args, "Launching kind");
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                ClusterCreateError::Failed(
                    format!("failed to launch {}: {}", self.binary.display(), e).into(),
                )
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        match config_problems(&stderr) {
            Some(problems) => Err(ClusterCreateError::InvalidConfig(problems)),
            None => Err(ClusterCreateError::Failed(
                format!("kind exited with {}: {}", output.status, stderr.trim()).into(),
            )),
        }
    }
}
