//! Orchestrator boundary
//!
//! The core only talks to the container orchestrator through [`Orchestrator`]:
//! - namespace, service and workload creation
//! - namespace deletion (cascades to everything inside it)
//! - instance listing
//! - command execution inside a running instance
//!
//! [`kubernetes::KubeOrchestrator`] is the production backend,
//! [`memory::InMemoryOrchestrator`] keeps everything in process.

pub mod kubernetes;
pub mod manifest;
pub mod memory;

pub use kubernetes::KubeOrchestrator;
pub use memory::{Call, InMemoryOrchestrator, Step};

use crate::cluster::ClusterDescriptor;
use crate::common::{Backend, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle phase reported by the orchestrator for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstancePhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl InstancePhase {
    /// Parse the orchestrator's phase string; anything unrecognised is `Unknown`
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => InstancePhase::Pending,
            "Running" => InstancePhase::Running,
            "Succeeded" => InstancePhase::Succeeded,
            "Failed" => InstancePhase::Failed,
            _ => InstancePhase::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstancePhase::Running)
    }
}

impl std::fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstancePhase::Pending => write!(f, "pending"),
            InstancePhase::Running => write!(f, "running"),
            InstancePhase::Succeeded => write!(f, "succeeded"),
            InstancePhase::Failed => write!(f, "failed"),
            InstancePhase::Unknown => write!(f, "unknown"),
        }
    }
}

/// One live replica, as last reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Opaque identity (pod name)
    pub id: String,
    pub namespace: String,
    /// Network address; absent until the orchestrator assigns one
    pub address: Option<String>,
    pub phase: InstancePhase,
    /// Container commands are executed in
    pub container: String,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }
}

/// Client for the container orchestrator hosting the clusters.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn create_namespace(&self, namespace: &str) -> Result<()>;

    async fn delete_namespace(&self, namespace: &str) -> Result<()>;

    async fn create_service(&self, descriptor: &ClusterDescriptor) -> Result<()>;

    async fn create_workload(&self, descriptor: &ClusterDescriptor) -> Result<()>;

    async fn list_instances(&self, namespace: &str) -> Result<Vec<Instance>>;

    /// Run `command` inside the instance's container; output is discarded.
    async fn exec(&self, instance: &Instance, command: &[String]) -> Result<()>;
}

/// Build the orchestrator selected by `backend`.
///
/// The Kubernetes client is configured from the ambient kubeconfig or the
/// in-cluster service account.
pub async fn connect(backend: Backend) -> Result<Arc<dyn Orchestrator>> {
    match backend {
        Backend::Kubernetes => {
            let client = kube::Client::try_default().await?;
            tracing::info!("Connected to Kubernetes API");
            Ok(Arc::new(KubeOrchestrator::new(client)))
        }
        Backend::Memory => {
            tracing::info!("Using in-memory orchestrator");
            Ok(Arc::new(InMemoryOrchestrator::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse() {
        assert_eq!(InstancePhase::parse("Running"), InstancePhase::Running);
        assert_eq!(InstancePhase::parse("Pending"), InstancePhase::Pending);
        assert_eq!(InstancePhase::parse("running"), InstancePhase::Unknown);
        assert_eq!(InstancePhase::parse(""), InstancePhase::Unknown);
        assert!(InstancePhase::Running.is_running());
        assert!(!InstancePhase::Succeeded.is_running());
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let orchestrator = connect(Backend::Memory).await.unwrap();
        assert!(orchestrator.list_instances("demo").await.unwrap().is_empty());
    }
}
