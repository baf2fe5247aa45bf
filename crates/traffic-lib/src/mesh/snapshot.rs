//! GitOps snapshot persistence for generated routing objects
//!
//! The snapshot directory is the durable source of truth for pull-based
//! delivery: a sync agent (Argo CD, Flux) applies whatever is on disk, so
//! files must always hold the most recently reconciled state. Writes are
//! plain overwrites, last write wins.

use super::config::RoutingPair;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to create snapshot directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write snapshot file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {kind} for {service}: {source}")]
    Serialize {
        kind: &'static str,
        service: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Writes generated object pairs into the GitOps directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize both objects and overwrite the per-service snapshot files.
    ///
    /// `host` is the normalized (lowercased) service name; it keys the file
    /// names so concurrent reconciles for different services never touch the
    /// same files. Returns the snapshot directory on success. Any failure
    /// here is fatal to the reconciliation.
    pub async fn write(&self, pair: &RoutingPair, host: &str) -> Result<PathBuf, SnapshotError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SnapshotError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let vs_yaml =
            serde_yaml::to_string(&pair.virtual_service).map_err(|source| {
                SnapshotError::Serialize {
                    kind: "VirtualService",
                    service: host.to_string(),
                    source,
                }
            })?;
        let dr_yaml =
            serde_yaml::to_string(&pair.destination_rule).map_err(|source| {
                SnapshotError::Serialize {
                    kind: "DestinationRule",
                    service: host.to_string(),
                    source,
                }
            })?;

        let vs_path = self.dir.join(format!("{host}-virtualservice.yaml"));
        let dr_path = self.dir.join(format!("{host}-destinationrule.yaml"));

        tokio::fs::write(&vs_path, vs_yaml)
            .await
            .map_err(|source| SnapshotError::WriteFile {
                path: vs_path.clone(),
                source,
            })?;
        tokio::fs::write(&dr_path, dr_yaml)
            .await
            .map_err(|source| SnapshotError::WriteFile {
                path: dr_path.clone(),
                source,
            })?;

        Ok(self.dir.clone())
    }
}
