use tracing::{error, info};

use crate::contract::{CodefreshApi, CoreError, Pipeline, RunOptions};

/// Trigger a run of `name` (e.g. `project/pipeline`) and return the build id.
pub async fn execute_pipeline<A>(
    api: &A,
    name: &str,
    opts: &RunOptions,
) -> Result<String, CoreError>
where
    A: CodefreshApi + ?Sized,
{
    info!(pipeline = %name, branch = opts.branch.as_deref().unwrap_or(""), "Running pipeline");
    match api.run_pipeline(name, opts).await {
        Ok(build_id) => {
            info!(pipeline = %name, build_id = %build_id, "Pipeline run started");
            Ok(build_id)
        }
        Err(e) => {
            error!(pipeline = %name, error = %e, "Failed to run pipeline");
            Err(e)
        }
    }
}

pub async fn list_pipelines<A>(api: &A) -> Result<Vec<Pipeline>, CoreError>
where
    A: CodefreshApi + ?Sized,
{
    let pipelines = api.list_pipelines().await.map_err(|e| {
        error!(error = %e, "Failed to get pipelines from Codefresh API");
        e
    })?;
    for p in &pipelines {
        info!(
            pipeline = %p.metadata.name,
            id = p.metadata.id.as_deref().unwrap_or(""),
            project = p.metadata.project.as_deref().unwrap_or(""),
            "Pipeline"
        );
    }
    Ok(pipelines)
}
