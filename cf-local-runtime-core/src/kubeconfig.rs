use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::contract::CoreError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KubeConfig {
    #[serde(rename = "current-context", default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    pub server: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    pub cluster: String,
    pub user: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl KubeConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read kubeconfig {}: {}", path.display(), e))?;
        let config: KubeConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("failed to parse kubeconfig {}: {}", path.display(), e))?;
        debug!(
            path = %path.display(),
            contexts = config.contexts.len(),
            current_context = config.current_context.as_deref().unwrap_or(""),
            "Loaded kubeconfig"
        );
        Ok(config)
    }

    pub fn current_context(&self) -> Result<&str, CoreError> {
        match self.current_context.as_deref() {
            Some(ctx) if !ctx.is_empty() => Ok(ctx),
            _ => Err("kubeconfig has no current-context".into()),
        }
    }

    pub fn context(&self, name: &str) -> Option<&NamedContext> {
        self.contexts.iter().find(|c| c.name == name)
    }
}

/// `$KUBECONFIG` (first entry) if set, otherwise `$HOME/.kube/config`.
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    if let Some(raw) = std::env::var_os("KUBECONFIG") {
        if let Some(first) = std::env::split_paths(&raw).find(|p| !p.as_os_str().is_empty()) {
            return Some(first);
        }
    }
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}
