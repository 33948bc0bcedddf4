/// `load_config` module: locates and reads the Codefresh credentials the
/// codefresh CLI stores in `$HOME/.cfconfig`.
///
/// The file format and context selection live in
/// [`cf_local_runtime_core::auth`]; this module only resolves which file and
/// which context the command line asked for and turns failures into
/// `anyhow::Error` diagnostics for the CLI boundary.
use anyhow::{anyhow, Result};
use cf_local_runtime_core::auth::{default_cfconfig_path, read_auth_context, AuthContext};
use tracing::{error, info};

use crate::cli::CodefreshArgs;

/// Loads the selected auth context from `--cfconfig` (or `$HOME/.cfconfig`).
pub fn load_config(args: &CodefreshArgs) -> Result<AuthContext> {
    let path = match &args.cfconfig {
        Some(path) => path.clone(),
        None => default_cfconfig_path()
            .ok_or_else(|| anyhow!("cannot locate the codefresh config: HOME is not set"))?,
    };
    info!(config_path = ?path, "Loading Codefresh credentials");

    match read_auth_context(&path, args.cf_context.as_deref()) {
        Ok(context) => {
            info!(context = %context.name, url = %context.url, "Codefresh credentials loaded");
            Ok(context)
        }
        Err(e) => {
            error!(error = %e, config_path = ?path, "Failed to load Codefresh credentials");
            Err(e.into())
        }
    }
}
