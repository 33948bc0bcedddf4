///
/// This module implements the CLI interface for cf-local-runtime: command
/// parsing, flag-to-option mapping and the async entrypoint.
///
/// All orchestration (cluster bootstrap, installer plugins, pipeline runs)
/// lives in the [`cf-local-runtime-core`] crate. This module only wires the
/// concrete kind/kubectl/Codefresh clients into it.
///
/// ## How To Use
/// - For command-line users: use the installed `cf-local-runtime` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`cf-local-runtime-core`]: ../../cf-local-runtime-core/
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use cf_local_runtime_core::cluster::{create_cluster, report_pods, KindCluster};
use cf_local_runtime_core::codefresh::CodefreshClient;
use cf_local_runtime_core::contract::{
    ClusterOptions, CodefreshApi, RunOptions, DEFAULT_CLUSTER_NAME,
};
use cf_local_runtime_core::install::{
    plan_install, run_install, InstallCmdOptions, InstallTarget, KubeOptions,
};
use cf_local_runtime_core::kubeconfig::default_kubeconfig_path;
use cf_local_runtime_core::kubectl::KubectlCli;
use cf_local_runtime_core::pipeline::{execute_pipeline, list_pipelines};
use cf_local_runtime_core::plugins::standard_registry;
use clap::{Args, Parser, Subcommand};

use crate::load_config::load_config;

/// CLI for cf-local-runtime: local kind clusters running a Codefresh runtime.
#[derive(Parser, Debug)]
#[clap(
    name = "cf-local-runtime",
    version,
    about = "Create a local kind cluster with the Codefresh venona runtime and run pipelines on it"
)]
pub struct Cli {
    /// Print debug logs
    #[clap(long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a resource
    Create {
        #[clap(subcommand)]
        item: Option<CreateItem>,
    },
    /// Exercise a resource
    Test {
        #[clap(subcommand)]
        item: Option<TestItem>,
    },
    /// Read resources from Codefresh
    Get {
        #[clap(subcommand)]
        item: Option<GetItem>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreateItem {
    /// Create a kind cluster and install the venona runtime into it
    Runtime(CreateRuntimeArgs),
}

#[derive(Subcommand, Debug)]
pub enum TestItem {
    /// Run a pipeline on the runtime
    Runtime(TestRuntimeArgs),
}

#[derive(Subcommand, Debug)]
pub enum GetItem {
    /// List the pipelines of the account
    Pipelines(GetPipelinesArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct GetPipelinesArgs {
    /// Print the full pipeline metadata as JSON
    #[clap(long)]
    pub json: bool,
    #[clap(flatten)]
    pub codefresh: CodefreshArgs,
}

/// Where to read Codefresh credentials from.
#[derive(Args, Debug, Clone, Default)]
pub struct CodefreshArgs {
    /// Path to the codefresh CLI config (defaults to $HOME/.cfconfig)
    #[clap(long)]
    pub cfconfig: Option<PathBuf>,
    /// Context in the codefresh config (defaults to its current-context)
    #[clap(long = "cf-context")]
    pub cf_context: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateRuntimeArgs {
    /// cluster context name
    #[clap(long, default_value = DEFAULT_CLUSTER_NAME)]
    pub name: String,
    /// path to a kind config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// node docker image to use for booting the cluster
    #[clap(long)]
    pub image: Option<String>,
    /// retain nodes for debugging when cluster creation fails
    #[clap(long)]
    pub retain: bool,
    /// Wait for control plane node to be ready
    #[clap(long, default_value = "120s", value_parser = humantime::parse_duration)]
    pub wait: Duration,
    /// Kubeconfig the cluster is written to (defaults to $KUBECONFIG or ~/.kube/config)
    #[clap(long)]
    pub kubeconfig: Option<PathBuf>,
    /// Only create the cluster, do not install venona
    #[clap(long)]
    pub skip_install: bool,
    #[clap(flatten)]
    pub codefresh: CodefreshArgs,
    #[clap(flatten)]
    pub install: InstallArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// cluster name as registered in Codefresh (defaults to the kube context)
    #[clap(long)]
    pub cluster_name: Option<String>,
    /// venona version to install (image tag)
    #[clap(long)]
    pub venona_version: Option<String>,
    /// existing runtime environment to attach venona to
    #[clap(long)]
    pub runtime_environment: Option<String>,
    /// namespace to install into
    #[clap(long, env = "KUBE_NAMESPACE")]
    pub kube_namespace: Option<String>,
    /// kube context to install into (defaults to the current context)
    #[clap(long = "kube-context-name", env = "KUBE_CONTEXT")]
    pub kube_context: Option<String>,
    /// use the in-cluster service account instead of a kubeconfig
    #[clap(long)]
    pub in_cluster: bool,
    /// storage class for the runtime volumes (defaults to the dind local volumes provisioner)
    #[clap(long)]
    pub storage_class: Option<String>,
    /// install venona only, using the runtime environment given by --runtime-environment
    #[clap(long)]
    pub skip_runtime_installation: bool,
    /// register the runtime environment only
    #[clap(long)]
    pub only_runtime_environment: bool,
    /// render everything without changing Codefresh or the cluster
    #[clap(long)]
    pub dry_run: bool,
    /// mark the runtime environment as the account default
    #[clap(long = "set-default")]
    pub set_default: bool,
    /// run builds with the kubernetes runner
    #[clap(long)]
    pub kubernetes_runner_type: bool,
}

impl From<&InstallArgs> for InstallCmdOptions {
    fn from(args: &InstallArgs) -> Self {
        InstallCmdOptions {
            cluster_name_in_codefresh: args.cluster_name.clone().unwrap_or_default(),
            venona_version: args.venona_version.clone().unwrap_or_default(),
            runtime_environment_name: args.runtime_environment.clone().unwrap_or_default(),
            kube: KubeOptions {
                namespace: args.kube_namespace.clone().unwrap_or_default(),
                context: args.kube_context.clone().unwrap_or_default(),
                in_cluster: args.in_cluster,
            },
            storage_class: args.storage_class.clone().unwrap_or_default(),
            skip_runtime_installation: args.skip_runtime_installation,
            install_only_runtime_environment: args.only_runtime_environment,
            dry_run: args.dry_run,
            set_default_runtime: args.set_default,
            kubernetes_runner_type: args.kubernetes_runner_type,
        }
    }
}

impl CreateRuntimeArgs {
    pub fn cluster_options(&self, kubeconfig: PathBuf) -> ClusterOptions {
        ClusterOptions {
            name: self.name.clone(),
            config: self.config.clone(),
            image: self.image.clone(),
            retain: self.retain,
            wait: self.wait,
            kubeconfig: Some(kubeconfig),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TestRuntimeArgs {
    /// pipeline to run, e.g. project/pipeline
    #[clap(long)]
    pub pipeline: String,
    /// branch to run the pipeline on
    #[clap(long)]
    pub branch: Option<String>,
    /// pipeline variable as KEY=VALUE, may be repeated
    #[clap(long = "variable", value_parser = parse_key_val)]
    pub variables: Vec<(String, String)>,
    #[clap(flatten)]
    pub codefresh: CodefreshArgs,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Create { item: Some(CreateItem::Runtime(args)) } => create_runtime(args).await,
        Commands::Create { item: None } => bail!("Provide item to the create command"),
        Commands::Test { item: Some(TestItem::Runtime(args)) } => test_runtime(args).await,
        Commands::Test { item: None } => bail!("Provide item to the test command"),
        Commands::Get { item: Some(GetItem::Pipelines(args)) } => get_pipelines(args).await,
        Commands::Get { item: None } => bail!("Provide item to the get command"),
    }
}

async fn create_runtime(args: CreateRuntimeArgs) -> Result<()> {
    tracing::info!(command = "create runtime", cluster = %args.name, "Starting");
    let install_opts = InstallCmdOptions::from(&args.install);

    // Fail on bad flags or missing credentials before a cluster exists.
    let auth = if args.skip_install {
        None
    } else {
        install_opts.validate().map_err(anyhow::Error::msg)?;
        Some(load_config(&args.codefresh)?)
    };

    let kubeconfig = args
        .kubeconfig
        .clone()
        .or_else(default_kubeconfig_path)
        .context("cannot determine a kubeconfig path; pass --kubeconfig")?;

    let provider = KindCluster::new();
    let cluster = create_cluster(&args.cluster_options(kubeconfig.clone()), &provider)
        .await
        .map_err(anyhow::Error::msg)?;
    tracing::info!(cluster = %cluster.name, kubeconfig = %kubeconfig.display(), "Cluster ready");

    let kubectl = Arc::new(KubectlCli::new());
    report_pods(kubectl.as_ref(), &kubeconfig)
        .await
        .map_err(|e| anyhow!("failed to list pods: {e}"))?;

    let Some(auth) = auth else {
        tracing::info!("Skipping venona installation");
        return Ok(());
    };

    let target = InstallTarget {
        codefresh_host: auth.url.clone(),
        codefresh_token: auth.token.clone(),
        kubeconfig,
    };
    let plan = plan_install(&install_opts, &target).map_err(anyhow::Error::msg)?;
    tracing::debug!(plugins = ?plan.plugins, "Installation planned");

    let api: Arc<dyn CodefreshApi> =
        Arc::new(CodefreshClient::from_auth_context(&auth).map_err(anyhow::Error::msg)?);
    let registry = standard_registry(api, kubectl);
    run_install(&plan, &registry)
        .await
        .map_err(anyhow::Error::msg)?;
    Ok(())
}

async fn test_runtime(args: TestRuntimeArgs) -> Result<()> {
    tracing::info!(command = "test runtime", pipeline = %args.pipeline, "Starting");
    let auth = load_config(&args.codefresh)?;
    let client = CodefreshClient::from_auth_context(&auth).map_err(anyhow::Error::msg)?;
    let opts = RunOptions {
        branch: args.branch,
        variables: args.variables.into_iter().collect(),
    };
    let build_id = execute_pipeline(&client, &args.pipeline, &opts)
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to run pipeline")?;
    println!("{}", build_id);
    Ok(())
}

async fn get_pipelines(args: GetPipelinesArgs) -> Result<()> {
    let auth = load_config(&args.codefresh)?;
    let client = CodefreshClient::from_auth_context(&auth).map_err(anyhow::Error::msg)?;
    let pipelines = list_pipelines(&client)
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to get pipelines from Codefresh API")?;
    tracing::info!(count = pipelines.len(), "Fetched pipelines");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&pipelines)?);
        return Ok(());
    }
    for p in pipelines {
        println!("{}", p.metadata.name);
    }
    Ok(())
}
