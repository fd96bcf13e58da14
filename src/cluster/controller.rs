//! Cluster lifecycle: create pipeline and teardown

use super::poller::{PollSettings, ReadinessPoller};
use super::replication::MeshConfigurator;
use super::ClusterDescriptor;
use crate::common::{LifecycleConfig, Result};
use crate::orchestrator::{Instance, Orchestrator};
use serde::Serialize;
use std::sync::Arc;

/// Last state reached by a create pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatePhase {
    Start,
    NamespaceCreated,
    ServiceCreated,
    WorkloadCreated,
    InstancesReady,
    MeshConfigured,
}

impl std::fmt::Display for CreatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreatePhase::Start => write!(f, "start"),
            CreatePhase::NamespaceCreated => write!(f, "namespace_created"),
            CreatePhase::ServiceCreated => write!(f, "service_created"),
            CreatePhase::WorkloadCreated => write!(f, "workload_created"),
            CreatePhase::InstancesReady => write!(f, "instances_ready"),
            CreatePhase::MeshConfigured => write!(f, "mesh_configured"),
        }
    }
}

/// Summary of a successful create
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub namespace: String,
    pub phase: CreatePhase,
    pub instances: Vec<Instance>,
    pub edges: usize,
}

pub struct LifecycleController {
    orchestrator: Arc<dyn Orchestrator>,
    poller: ReadinessPoller,
    mesh: MeshConfigurator,
}

impl LifecycleController {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, config: &LifecycleConfig) -> Self {
        Self {
            poller: ReadinessPoller::new(orchestrator.clone(), PollSettings::from(config)),
            mesh: MeshConfigurator::new(
                orchestrator.clone(),
                config.settle_delay(),
                config.bootstrap_policy,
            ),
            orchestrator,
        }
    }

    /// Create the cluster and wire its replication mesh.
    ///
    /// Stops at the first failing step and returns its error. Resources
    /// created by earlier steps are left for [`LifecycleController::delete`].
    pub async fn create(&self, descriptor: &ClusterDescriptor) -> Result<ClusterReport> {
        let namespace = descriptor.namespace();
        tracing::info!(
            cluster = %namespace,
            replicas = descriptor.replicas(),
            image = %descriptor.image(),
            database = %descriptor.database(),
            "Creating cluster"
        );

        let mut phase = CreatePhase::Start;
        match self.run_create(descriptor, &mut phase).await {
            Ok(report) => {
                tracing::info!(cluster = %namespace, edges = report.edges, "Cluster setup done");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    cluster = %namespace,
                    phase = %phase,
                    error = %e,
                    "Cluster creation failed"
                );
                Err(e)
            }
        }
    }

    async fn run_create(
        &self,
        descriptor: &ClusterDescriptor,
        phase: &mut CreatePhase,
    ) -> Result<ClusterReport> {
        let namespace = descriptor.namespace();

        tracing::info!(cluster = %namespace, "Creating namespace");
        self.orchestrator.create_namespace(namespace).await?;
        *phase = CreatePhase::NamespaceCreated;

        tracing::info!(cluster = %namespace, "Creating service");
        self.orchestrator.create_service(descriptor).await?;
        *phase = CreatePhase::ServiceCreated;

        tracing::info!(cluster = %namespace, "Creating workload");
        self.orchestrator.create_workload(descriptor).await?;
        *phase = CreatePhase::WorkloadCreated;

        tracing::info!(cluster = %namespace, "Waiting for cluster participants to be running");
        let instances = self.poller.wait_until_ready(descriptor).await?;
        *phase = CreatePhase::InstancesReady;

        tracing::info!(cluster = %namespace, "Configuring replication");
        let edges = self.mesh.configure_mesh(descriptor, &instances).await?;
        *phase = CreatePhase::MeshConfigured;

        Ok(ClusterReport {
            namespace: namespace.to_string(),
            phase: *phase,
            instances,
            edges,
        })
    }

    /// Delete the cluster's namespace; the orchestrator removes everything in it.
    pub async fn delete(&self, namespace: &str) -> Result<()> {
        tracing::info!(cluster = %namespace, "Deleting cluster");
        self.orchestrator
            .delete_namespace(namespace)
            .await
            .inspect_err(|e| {
                tracing::error!(cluster = %namespace, error = %e, "Cluster deletion failed");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ClusterDefaults, Error};
    use crate::orchestrator::memory::{Call, InMemoryOrchestrator, Step};

    fn config() -> LifecycleConfig {
        LifecycleConfig {
            poll_interval_ms: 1,
            settle_delay_ms: 0,
            ..Default::default()
        }
    }

    fn descriptor() -> ClusterDescriptor {
        ClusterDescriptor::new("demo", "orders", &ClusterDefaults::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_runs_full_pipeline() {
        let orch = Arc::new(InMemoryOrchestrator::new());
        let controller = LifecycleController::new(orch.clone(), &config());

        let report = controller.create(&descriptor()).await.unwrap();
        assert_eq!(report.phase, CreatePhase::MeshConfigured);
        assert_eq!(report.instances.len(), 3);
        assert_eq!(report.edges, 6);

        let calls = orch.calls();
        assert_eq!(
            &calls[..4],
            &[
                Call::CreateNamespace("demo".into()),
                Call::CreateService("demo".into()),
                Call::CreateWorkload("demo".into()),
                Call::ListInstances("demo".into()),
            ]
        );
        assert!(calls[4..].iter().all(|c| c.step() == Step::Exec));
    }

    #[tokio::test]
    async fn test_create_stops_at_first_failure() {
        let orch = Arc::new(InMemoryOrchestrator::new());
        orch.fail_step(Step::CreateService);
        let controller = LifecycleController::new(orch.clone(), &config());

        let err = controller.create(&descriptor()).await.unwrap_err();
        assert!(matches!(err, Error::Orchestrator(_)));
        assert_eq!(
            orch.calls(),
            vec![
                Call::CreateNamespace("demo".into()),
                Call::CreateService("demo".into()),
            ]
        );
        // no compensating cleanup
        assert!(orch.has_namespace("demo"));
    }

    #[tokio::test]
    async fn test_delete_issues_single_call() {
        let orch = Arc::new(InMemoryOrchestrator::new());
        let controller = LifecycleController::new(orch.clone(), &config());
        controller.create(&descriptor()).await.unwrap();
        let before = orch.calls().len();

        controller.delete("demo").await.unwrap();
        let calls = orch.calls();
        assert_eq!(calls.len(), before + 1);
        assert_eq!(calls[before], Call::DeleteNamespace("demo".into()));
        assert!(!orch.has_namespace("demo"));
    }

    #[test]
    fn test_phase_order() {
        assert!(CreatePhase::Start < CreatePhase::NamespaceCreated);
        assert!(CreatePhase::InstancesReady < CreatePhase::MeshConfigured);
        assert_eq!(CreatePhase::WorkloadCreated.to_string(), "workload_created");
    }
}
