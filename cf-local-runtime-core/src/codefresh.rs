#![doc = "HTTP client for the Codefresh API, implementing the CodefreshApi contract."]
//
//! # Codefresh client
//!
//! - Construct [`CodefreshClient`] from an [`AuthContext`] (usually read from `$HOME/.cfconfig`).
//! - Every request carries the API key in the `Authorization` header.
//! - Non-2xx responses become errors carrying method, path, status and body.

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthContext;
use crate::contract::{
    AgentToken, CodefreshApi, CoreError, CreateRuntimeOptions, Pipeline, RunOptions,
    RuntimeEnvironment,
};

pub const DEFAULT_HOST: &str = "https://g.codefresh.io";

pub struct CodefreshClient {
    http: Client,
    host: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PipelineList {
    #[serde(default)]
    docs: Vec<Pipeline>,
}

impl CodefreshClient {
    pub fn new(host: &str, token: &str) -> Result<Self, CoreError> {
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        let host =
            Url::parse(host).map_err(|e| format!("invalid Codefresh host {:?}: {}", host, e))?;
        tracing::info!(host = %host, token_set = !token.is_empty(), "Initialized Codefresh client");
        Ok(Self {
            http: Client::new(),
            host,
            token: token.to_string(),
        })
    }

    pub fn from_auth_context(ctx: &AuthContext) -> Result<Self, CoreError> {
        Self::new(&ctx.url, &ctx.token)
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Build `<host>/api/<segments...>`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, CoreError> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|_| format!("Codefresh host {} cannot be a base URL", self.host))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<serde_json::Value>,
    ) -> Result<String, CoreError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "Codefresh API request");
        let mut req = self
            .http
            .request(method.clone(), url.clone())
            .header(reqwest::header::AUTHORIZATION, &self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::error!(
                %method,
                path = url.path(),
                %status,
                body = %text,
                "Codefresh API error"
            );
            return Err(format!(
                "Codefresh API {} {} failed with status {}: {}",
                method,
                url.path(),
                status,
                text
            )
            .into());
        }
        Ok(text)
    }
}

#[async_trait]
impl CodefreshApi for CodefreshClient {
    async fn run_pipeline(&self, name: &str, opts: &RunOptions) -> Result<String, CoreError> {
        let body = serde_json::to_value(opts)?;
        let text = self
            .send(Method::POST, &["pipelines", "run", name], Some(body))
            .await?;
        // The API answers with a JSON string holding the build id.
        let build_id =
            serde_json::from_str::<String>(&text).unwrap_or_else(|_| text.trim().to_string());
        Ok(build_id)
    }

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, CoreError> {
        let text = self.send(Method::GET, &["pipelines"], None).await?;
        let list: PipelineList = serde_json::from_str(&text)?;
        Ok(list.docs)
    }

    async fn create_runtime_environment(
        &self,
        opts: &CreateRuntimeOptions,
    ) -> Result<RuntimeEnvironment, CoreError> {
        let mut body = json!({
            "clusterName": opts.cluster,
            "namespace": opts.namespace,
        });
        if opts.has_agent {
            body["agent"] = json!(true);
        }
        if let Some(sc) = &opts.storage_class {
            body["storageClassName"] = json!(sc);
        }
        if let Some(runner) = &opts.runner_type {
            body["runnerType"] = json!(runner);
        }
        self.send(Method::POST, &["custom_clusters", "register"], Some(body))
            .await?;
        Ok(RuntimeEnvironment {
            name: format!("{}/{}", opts.cluster, opts.namespace),
        })
    }

    async fn set_default_runtime_environment(&self, name: &str) -> Result<(), CoreError> {
        self.send(
            Method::PUT,
            &["runtime-environments", "default", name],
            None,
        )
        .await?;
        Ok(())
    }

    async fn create_agent(&self, name: &str, runtimes: &[String]) -> Result<AgentToken, CoreError> {
        let body = json!({ "name": name, "runtimes": runtimes });
        let text = self.send(Method::POST, &["agents"], Some(body)).await?;
        let token: AgentToken = serde_json::from_str(&text)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_pipeline_names() {
        let client = CodefreshClient::new("https://g.codefresh.io", "t").unwrap();
        let url = client
            .endpoint(&["pipelines", "run", "default/MyPipeline"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://g.codefresh.io/api/pipelines/run/default%2FMyPipeline"
        );
    }

    #[test]
    fn endpoint_keeps_host_path_prefix() {
        let client = CodefreshClient::new("https://cf.example.com/onprem/", "t").unwrap();
        let url = client.endpoint(&["agents"]).unwrap();
        assert_eq!(url.as_str(), "https://cf.example.com/onprem/api/agents");
    }

    #[test]
    fn empty_host_falls_back_to_default() {
        let client = CodefreshClient::new("", "t").unwrap();
        assert_eq!(client.host().as_str(), "https://g.codefresh.io/");
    }
}
