use anyhow::Result;
use cf_local_runtime::cli::{run, Cli};
use cf_local_runtime::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
