//! Codefresh credentials stored by the codefresh CLI in `$HOME/.cfconfig`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub const CFCONFIG_FILE_NAME: &str = ".cfconfig";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    #[serde(default)]
    pub name: String,
    /// Codefresh host; empty means the SaaS default.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub beta: bool,
    #[serde(rename = "onPrem", default)]
    pub on_prem: bool,
}

#[derive(Debug, Deserialize)]
struct CfConfigFile {
    #[serde(default)]
    contexts: BTreeMap<String, AuthContext>,
    #[serde(rename = "current-context", default)]
    current_context: Option<String>,
}

#[derive(Debug)]
pub enum AuthError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, serde_yaml::Error),
    NoCurrentContext,
    UnknownContext(String),
    MissingToken(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(path, e) => write!(
                f,
                "Failed to read codefresh config file {}: {}",
                path.display(),
                e
            ),
            Self::Parse(path, e) => write!(
                f,
                "Failed to parse codefresh config file {}: {}",
                path.display(),
                e
            ),
            Self::NoCurrentContext => write!(f, "codefresh config has no current-context"),
            Self::UnknownContext(name) => {
                write!(f, "context {:?} not found in codefresh config", name)
            }
            Self::MissingToken(name) => write!(f, "context {:?} has no token", name),
        }
    }
}

impl std::error::Error for AuthError {}

/// `$HOME/.cfconfig`.
pub fn default_cfconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CFCONFIG_FILE_NAME))
}

/// Read the named context, or the current one when `name` is empty or absent.
pub fn read_auth_context(path: &Path, name: Option<&str>) -> Result<AuthContext, AuthError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read codefresh config file");
        AuthError::Read(path.to_path_buf(), e)
    })?;
    let file: CfConfigFile =
        serde_yaml::from_str(&content).map_err(|e| AuthError::Parse(path.to_path_buf(), e))?;

    let selected = match name.filter(|n| !n.is_empty()) {
        Some(n) => n.to_string(),
        None => file
            .current_context
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::NoCurrentContext)?,
    };

    let mut context = file
        .contexts
        .get(&selected)
        .cloned()
        .ok_or_else(|| AuthError::UnknownContext(selected.clone()))?;
    if context.name.is_empty() {
        context.name = selected.clone();
    }
    if context.token.is_empty() {
        return Err(AuthError::MissingToken(selected));
    }
    debug!(context = %context.name, url = %context.url, "Loaded codefresh auth context");
    Ok(context)
}
