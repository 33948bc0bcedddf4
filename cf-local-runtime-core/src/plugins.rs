//! The installer plugins selected by [`crate::install::plan_install`].
//!
//! Each plugin performs one step against Codefresh and/or the cluster and
//! records what later steps need in the shared [`Values`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::contract::{CodefreshApi, CoreError, CreateRuntimeOptions, Kubectl, Plugin, Values};
use crate::install::{PluginInstallOptions, PluginRegistry, PluginType};
use crate::templates;

pub const KUBERNETES_RUNNER_TYPE: &str = "kubernetes";

fn string_value<'a>(values: &'a Values, key: &str) -> Option<&'a str> {
    values.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// Render a manifest and apply it, or only log it under dry run.
async fn apply_template(
    kubectl: &dyn Kubectl,
    template: &str,
    opts: &PluginInstallOptions,
    values: &Values,
) -> Result<(), CoreError> {
    let manifest = templates::render(template, values)?;
    if opts.dry_run {
        info!(manifest = %manifest, "Dry run: manifest not applied");
        return Ok(());
    }
    kubectl.apply(&manifest, &opts.kube).await
}

/// Registers the runtime environment in Codefresh.
pub struct RuntimeEnvironmentPlugin {
    api: Arc<dyn CodefreshApi>,
}

impl RuntimeEnvironmentPlugin {
    pub fn new(api: Arc<dyn CodefreshApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Plugin for RuntimeEnvironmentPlugin {
    async fn install(
        &self,
        opts: &PluginInstallOptions,
        mut values: Values,
    ) -> Result<Values, CoreError> {
        let name = format!("{}/{}", opts.cluster_name, opts.cluster_namespace);
        if opts.dry_run {
            info!(runtime_environment = %name, "Dry run: runtime environment not created");
            values.insert("RuntimeEnvironment".into(), json!(name));
            return Ok(values);
        }

        let request = CreateRuntimeOptions {
            cluster: opts.cluster_name.clone(),
            namespace: opts.cluster_namespace.clone(),
            has_agent: opts.register_with_agent,
            storage_class: Some(opts.effective_storage_class()).filter(|s| !s.is_empty()),
            runner_type: opts
                .kubernetes_runner_type
                .then(|| KUBERNETES_RUNNER_TYPE.to_string()),
        };
        let re = self.api.create_runtime_environment(&request).await?;
        info!(runtime_environment = %re.name, "Runtime environment created");

        if opts.mark_as_default {
            self.api.set_default_runtime_environment(&re.name).await?;
            info!(runtime_environment = %re.name, "Runtime environment set as default");
        }

        values.insert("RuntimeEnvironment".into(), json!(re.name));
        Ok(values)
    }
}

/// Registers the venona agent and deploys it into the cluster.
pub struct VenonaPlugin {
    api: Arc<dyn CodefreshApi>,
    kubectl: Arc<dyn Kubectl>,
}

impl VenonaPlugin {
    pub fn new(api: Arc<dyn CodefreshApi>, kubectl: Arc<dyn Kubectl>) -> Self {
        Self { api, kubectl }
    }
}

#[async_trait]
impl Plugin for VenonaPlugin {
    async fn install(
        &self,
        opts: &PluginInstallOptions,
        mut values: Values,
    ) -> Result<Values, CoreError> {
        let runtime = string_value(&values, "RuntimeEnvironment")
            .ok_or("no runtime environment to attach venona to; pass --runtime-environment")?
            .to_string();

        if opts.dry_run {
            values.insert("AgentToken".into(), json!("dry-run"));
        } else {
            let agent_name = format!("{}_{}", opts.cluster_name, opts.cluster_namespace);
            let agent = self
                .api
                .create_agent(&agent_name, std::slice::from_ref(&runtime))
                .await?;
            info!(agent = %agent_name, runtime_environment = %runtime, "Agent registered");
            values.insert("AgentToken".into(), json!(agent.token));
            if let Some(id) = agent.id {
                values.insert("AgentId".into(), json!(id));
            }
        }

        apply_template(self.kubectl.as_ref(), templates::VENONA, opts, &values).await?;
        info!(namespace = %opts.cluster_namespace, "Venona installed");
        Ok(values)
    }
}

/// Grants the kubernetes runner what it needs in the namespace.
pub struct EnginePlugin {
    kubectl: Arc<dyn Kubectl>,
}

impl EnginePlugin {
    pub fn new(kubectl: Arc<dyn Kubectl>) -> Self {
        Self { kubectl }
    }
}

#[async_trait]
impl Plugin for EnginePlugin {
    async fn install(
        &self,
        opts: &PluginInstallOptions,
        values: Values,
    ) -> Result<Values, CoreError> {
        apply_template(self.kubectl.as_ref(), templates::ENGINE, opts, &values).await?;
        info!(namespace = %opts.cluster_namespace, "Engine installed");
        Ok(values)
    }
}

/// Deploys the dind volume provisioner and its default storage class.
pub struct VolumeProvisionerPlugin {
    kubectl: Arc<dyn Kubectl>,
}

impl VolumeProvisionerPlugin {
    pub fn new(kubectl: Arc<dyn Kubectl>) -> Self {
        Self { kubectl }
    }
}

#[async_trait]
impl Plugin for VolumeProvisionerPlugin {
    async fn install(
        &self,
        opts: &PluginInstallOptions,
        mut values: Values,
    ) -> Result<Values, CoreError> {
        let storage_class = opts.effective_storage_class();
        values.insert("StorageClass".into(), json!(storage_class));
        apply_template(
            self.kubectl.as_ref(),
            templates::VOLUME_PROVISIONER,
            opts,
            &values,
        )
        .await?;
        info!(storage_class = %storage_class, "Volume provisioner installed");
        Ok(values)
    }
}

/// Registry holding one default plugin per [`PluginType`].
pub fn standard_registry(api: Arc<dyn CodefreshApi>, kubectl: Arc<dyn Kubectl>) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register(
            PluginType::RuntimeEnvironment,
            Arc::new(RuntimeEnvironmentPlugin::new(api.clone())),
        )
        .register(
            PluginType::Venona,
            Arc::new(VenonaPlugin::new(api, kubectl.clone())),
        )
        .register(PluginType::Engine, Arc::new(EnginePlugin::new(kubectl.clone())))
        .register(
            PluginType::VolumeProvisioner,
            Arc::new(VolumeProvisionerPlugin::new(kubectl)),
        );
    registry
}
