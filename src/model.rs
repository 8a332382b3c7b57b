use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process-wide settings assembled from CLI flags and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub api_url: String,
    pub auth_url: String,
    pub docker_bin: String,
    pub token_env: String,
    pub registry: String,
    pub user_agent: String,
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("runes_cli.db")
    }

    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join("registry.key")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Ledger status; persisted as its integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadStatus {
    Stopped = 0,
    Running = 1,
}

impl WorkloadStatus {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Anything other than 1 reads back as stopped.
    pub fn from_i64(v: i64) -> Self {
        if v == 1 {
            WorkloadStatus::Running
        } else {
            WorkloadStatus::Stopped
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkloadStatus::Stopped => "stopped",
            WorkloadStatus::Running => "running",
        }
    }
}

/// One ledger row per successful container launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadInstance {
    pub id: i64,
    pub pid: i64,
    pub container_id: String,
    pub remote_name: String,
    pub remote_description: String,
    pub associated_token: Option<String>,
    pub status: WorkloadStatus,
}

impl WorkloadInstance {
    /// First 12 characters of the container id, the way `docker ps` prints it.
    pub fn short_id(&self) -> &str {
        short_container_id(&self.container_id)
    }
}

/// At most the first 12 characters of `id`, cut on a char boundary.
pub fn short_container_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// What the caller wants launched.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub image: String,
    pub remote_name: String,
    pub remote_description: String,
    pub token: Option<String>,
    pub gpu: bool,
}

/// What the runtime confirmed after create+run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub container_id: String,
    pub pid: i64,
}

/// Live state as reported by the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    NotRunning(String),
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

/// A published image in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImage {
    #[serde(default)]
    pub id: Option<String>,
    pub remote_name: String,
    #[serde(default)]
    pub remote_description: String,
    pub image_name: String,
    #[serde(default)]
    pub remote_version: Option<String>,
    #[serde(default)]
    pub remote_category: Option<String>,
    #[serde(default)]
    pub remote_author: Option<String>,
}

/// A published notebook source in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
    #[serde(default)]
    pub id: Option<String>,
    pub remote_name: String,
    #[serde(default)]
    pub remote_description: String,
    pub source_url: String,
    #[serde(default)]
    pub remote_version: Option<String>,
}

/// Body for publishing a new notebook source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSubmission {
    pub remote_name: String,
    pub remote_description: String,
    pub remote_category: String,
    pub remote_author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colab_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_version: Option<String>,
}

/// Body for registering a pushed image with the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRegistration {
    pub remote_name: String,
    pub remote_description: String,
    pub remote_category: String,
    pub remote_author: String,
    pub image_name: String,
    pub remote_version: String,
}
