use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::contract::{CoreError, KubeTarget, Kubectl, PodSummary};

/// [`Kubectl`] backed by the `kubectl` binary.
pub struct KubectlCli {
    binary: PathBuf,
}

impl KubectlCli {
    pub fn new() -> Self {
        Self::with_binary("kubectl")
    }

    pub fn with_binary<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for KubectlCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection flags for a target; in-cluster targets rely on the service account.
pub fn target_args(target: &KubeTarget) -> Vec<String> {
    let mut args = Vec::new();
    if !target.in_cluster {
        args.push(format!("--kubeconfig={}", target.kubeconfig.display()));
        if !target.context.is_empty() {
            args.push(format!("--context={}", target.context));
        }
    }
    if !target.namespace.is_empty() {
        args.push(format!("--namespace={}", target.namespace));
    }
    args
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodItem>,
}

#[derive(Deserialize)]
struct PodItem {
    metadata: PodMetadata,
    #[serde(default)]
    status: Option<PodStatus>,
}

#[derive(Deserialize)]
struct PodMetadata {
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: Option<String>,
}

/// Parse `kubectl get pods -o json` output.
pub fn parse_pod_list(json: &str) -> Result<Vec<PodSummary>, CoreError> {
    let list: PodList = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|p| PodSummary {
            name: p.metadata.name,
            namespace: p.metadata.namespace,
            phase: p.status.and_then(|s| s.phase),
        })
        .collect())
}

#[async_trait]
impl Kubectl for KubectlCli {
    async fn apply(&self, manifest: &str, target: &KubeTarget) -> Result<(), CoreError> {
        let mut child = Command::new(&self.binary)
            .args(target_args(target))
            .args(["apply", "-f", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to launch {}: {}", self.binary.display(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(manifest.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(format!(
                "kubectl apply exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!(context = %target.context, namespace = %target.namespace, "{}", line);
        }
        Ok(())
    }

    async fn list_pods(&self, kubeconfig: &Path) -> Result<Vec<PodSummary>, CoreError> {
        let output = Command::new(&self.binary)
            .arg(format!("--kubeconfig={}", kubeconfig.display()))
            .args(["get", "pods", "--all-namespaces", "-o", "json"])
            .output()
            .await
            .map_err(|e| format!("failed to launch {}: {}", self.binary.display(), e))?;
        if !output.status.success() {
            return Err(format!(
                "kubectl get pods exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }
        parse_pod_list(&String::from_utf8_lossy(&output.stdout))
    }
}
