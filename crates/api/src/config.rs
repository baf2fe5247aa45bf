//! Service configuration

use anyhow::Result;
use serde::Deserialize;

/// Traffic manager configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// API server port for the rule API and probes
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Namespace the generated mesh objects live in
    #[serde(default = "default_mesh_namespace")]
    pub mesh_namespace: String,

    /// Directory the GitOps snapshots are written to
    #[serde(default = "default_gitops_dir")]
    pub gitops_dir: String,

    /// Upper bound for a single cluster API call, in seconds
    #[serde(default = "default_cluster_timeout")]
    pub cluster_timeout_secs: u64,
}

fn default_api_port() -> u16 {
    4000
}

fn default_mesh_namespace() -> String {
    "default".to_string()
}

fn default_gitops_dir() -> String {
    "gitops/istio".to_string()
}

fn default_cluster_timeout() -> u64 {
    5
}

impl ServerConfig {
    /// Load configuration from TSM_* environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TSM"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ServerConfig {
            api_port: default_api_port(),
            mesh_namespace: default_mesh_namespace(),
            gitops_dir: default_gitops_dir(),
            cluster_timeout_secs: default_cluster_timeout(),
        }))
    }
}
