//! Venona installation: turns the installer flags into an ordered list of
//! plugins plus the options and values they run with, then runs them.
//!
//! # Flow
//! - [`plan_install`] validates flag combinations, resolves the kube context
//!   and namespace, and selects plugins in a fixed order.
//! - [`run_install`] threads [`Values`] through every selected plugin and
//!   aborts on the first failure.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::contract::{CoreError, KubeTarget, Plugin, Values};
use crate::kubeconfig::KubeConfig;

/// Default storage classes are named after this prefix.
pub const DEFAULT_STORAGE_CLASS_NAME_PREFIX: &str = "dind-local-volumes-venona";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const APP_NAME: &str = "venona";
pub const DEFAULT_IMAGE_NAME: &str = "codefresh/venona";
pub const DEFAULT_IMAGE_TAG: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginType {
    Engine,
    RuntimeEnvironment,
    Venona,
    VolumeProvisioner,
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginType::Engine => "engine",
            PluginType::RuntimeEnvironment => "runtime-environment",
            PluginType::Venona => "venona",
            PluginType::VolumeProvisioner => "volume-provisioner",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KubeOptions {
    pub namespace: String,
    pub context: String,
    pub in_cluster: bool,
}

/// Installer flags as given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallCmdOptions {
    pub cluster_name_in_codefresh: String,
    pub venona_version: String,
    pub runtime_environment_name: String,
    pub kube: KubeOptions,
    pub storage_class: String,
    pub skip_runtime_installation: bool,
    pub install_only_runtime_environment: bool,
    pub dry_run: bool,
    pub set_default_runtime: bool,
    pub kubernetes_runner_type: bool,
}

impl InstallCmdOptions {
    /// Reject flag combinations that can never produce a valid plan.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.install_only_runtime_environment && self.skip_runtime_installation {
            return Err(
                "Cannot use both flags skip-runtime-installation and only-runtime-environment"
                    .into(),
            );
        }
        if self.skip_runtime_installation && self.runtime_environment_name.is_empty() {
            return Err(
                "runtime-environment flag is required when using flag skip-runtime-installation"
                    .into(),
            );
        }
        Ok(())
    }
}

/// Ordered, append-only selection of plugins.
#[derive(Debug, Default)]
pub struct PluginBuilder {
    plugins: Vec<PluginType>,
}

impl PluginBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: PluginType) -> &mut Self {
        self.plugins.push(plugin);
        self
    }

    pub fn get(&self) -> &[PluginType] {
        &self.plugins
    }
}

/// Options handed to every plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInstallOptions {
    pub codefresh_host: String,
    pub codefresh_token: String,
    pub mark_as_default: bool,
    pub storage_class: String,
    pub is_default_storage_class: bool,
    pub dry_run: bool,
    pub kubernetes_runner_type: bool,
    /// Name of the cluster as registered in Codefresh.
    pub cluster_name: String,
    pub register_with_agent: bool,
    pub cluster_namespace: String,
    pub kube: KubeTarget,
}

impl PluginInstallOptions {
    /// Storage class the runtime uses; default ones are suffixed with the namespace.
    pub fn effective_storage_class(&self) -> String {
        if self.is_default_storage_class {
            format!("{}-{}", self.storage_class, self.cluster_namespace)
        } else {
            self.storage_class.clone()
        }
    }
}

/// Codefresh credentials and the kubeconfig the installation targets.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallTarget {
    pub codefresh_host: String,
    pub codefresh_token: String,
    pub kubeconfig: PathBuf,
}

#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub plugins: Vec<PluginType>,
    pub options: PluginInstallOptions,
    pub values: Values,
}

pub fn is_using_default_storage_class(storage_class: &str) -> bool {
    storage_class.is_empty() || storage_class.starts_with(DEFAULT_STORAGE_CLASS_NAME_PREFIX)
}

/// Decide which plugins run, in which order, and with which options.
pub fn plan_install(
    opts: &InstallCmdOptions,
    target: &InstallTarget,
) -> Result<InstallPlan, CoreError> {
    opts.validate()?;

    let mut builder = PluginBuilder::new();
    let is_default = is_using_default_storage_class(&opts.storage_class);

    if opts.kubernetes_runner_type {
        builder.add(PluginType::Engine);
    }

    let storage_class = if is_default {
        DEFAULT_STORAGE_CLASS_NAME_PREFIX.to_string()
    } else {
        opts.storage_class.clone()
    };

    let context = if opts.kube.context.is_empty() {
        let config = KubeConfig::load(&target.kubeconfig)?;
        let current = config.current_context()?.to_string();
        debug!(kube_context_name = %current, "Kube Context is not set, using current context");
        current
    } else {
        opts.kube.context.clone()
    };
    let namespace = if opts.kube.namespace.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        opts.kube.namespace.clone()
    };

    if opts.dry_run {
        info!("Running in dry-run mode");
    }

    let image_tag = if opts.venona_version.is_empty() {
        DEFAULT_IMAGE_TAG.to_string()
    } else {
        info!(version = %opts.venona_version, "Version set manually");
        opts.venona_version.clone()
    };

    let mut runtime_environment = None;
    if opts.install_only_runtime_environment {
        builder.add(PluginType::RuntimeEnvironment);
    } else if opts.skip_runtime_installation {
        runtime_environment = Some(opts.runtime_environment_name.clone());
        info!("Skipping installation of runtime environment, installing venona only");
        builder.add(PluginType::Venona);
    } else {
        builder
            .add(PluginType::RuntimeEnvironment)
            .add(PluginType::Venona);
    }

    if is_default {
        builder.add(PluginType::VolumeProvisioner);
    } else {
        info!("Custom StorageClass is set, skipping installation of default volume provisioner");
    }

    let (cluster_name, register_with_agent) = if opts.cluster_name_in_codefresh.is_empty() {
        (context.clone(), true)
    } else {
        (opts.cluster_name_in_codefresh.clone(), false)
    };

    let options = PluginInstallOptions {
        codefresh_host: target.codefresh_host.clone(),
        codefresh_token: target.codefresh_token.clone(),
        mark_as_default: opts.set_default_runtime,
        storage_class,
        is_default_storage_class: is_default,
        dry_run: opts.dry_run,
        kubernetes_runner_type: opts.kubernetes_runner_type,
        cluster_name,
        register_with_agent,
        cluster_namespace: namespace.clone(),
        kube: KubeTarget {
            kubeconfig: target.kubeconfig.clone(),
            context: context.clone(),
            namespace: namespace.clone(),
            in_cluster: opts.kube.in_cluster,
        },
    };

    let mut values = Values::new();
    values.insert("AppName".into(), json!(APP_NAME));
    values.insert("Namespace".into(), json!(namespace));
    values.insert("Context".into(), json!(context));
    values.insert("ClusterName".into(), json!(options.cluster_name));
    values.insert("StorageClass".into(), json!(options.effective_storage_class()));
    values.insert("ImageName".into(), json!(DEFAULT_IMAGE_NAME));
    values.insert("ImageTag".into(), json!(image_tag));
    values.insert("CodefreshHost".into(), json!(target.codefresh_host));
    values.insert("DryRun".into(), json!(opts.dry_run));
    if let Some(re) = runtime_environment {
        values.insert("RuntimeEnvironment".into(), json!(re));
    }

    Ok(InstallPlan {
        plugins: builder.get().to_vec(),
        options,
        values,
    })
}

/// Plugins available to [`run_install`], keyed by type.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<PluginType, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: PluginType, plugin: Arc<dyn Plugin>) -> &mut Self {
        self.plugins.insert(kind, plugin);
        self
    }

    pub fn get(&self, kind: PluginType) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(&kind)
    }
}

/// Run every planned plugin in order; the first error aborts the installation.
pub async fn run_install(
    plan: &InstallPlan,
    registry: &PluginRegistry,
) -> Result<Values, CoreError> {
    let mut values = plan.values.clone();
    for kind in &plan.plugins {
        let plugin = registry
            .get(*kind)
            .ok_or_else(|| format!("no installer plugin registered for {}", kind))?;
        info!(plugin = %kind, "Running installer plugin");
        values = plugin
            .install(&plan.options, values)
            .await
            .map_err(|e| format!("{} plugin failed: {}", kind, e))?;
    }
    info!("Installation completed Successfully");
    Ok(values)
}
