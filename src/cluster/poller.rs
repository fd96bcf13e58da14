//! Wait until a cluster's workload is fully up

use super::ClusterDescriptor;
use crate::common::{Error, LifecycleConfig, Result};
use crate::orchestrator::{Instance, InstancePhase, Orchestrator};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed delay between two listings
    pub interval: Duration,
    /// `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: None,
        }
    }
}

impl From<&LifecycleConfig> for PollSettings {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.ready_timeout(),
        }
    }
}

/// Outcome of checking one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    CountMismatch { expected: u32, observed: usize },
    NotRunning { instance: String, phase: InstancePhase },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Ready means exactly `expected` instances, all running.
pub fn check_readiness(instances: &[Instance], expected: u32) -> Readiness {
    if instances.len() != expected as usize {
        return Readiness::CountMismatch {
            expected,
            observed: instances.len(),
        };
    }

    match instances.iter().find(|i| !i.is_running()) {
        Some(instance) => Readiness::NotRunning {
            instance: instance.id.clone(),
            phase: instance.phase,
        },
        None => Readiness::Ready,
    }
}

pub struct ReadinessPoller {
    orchestrator: Arc<dyn Orchestrator>,
    settings: PollSettings,
}

impl ReadinessPoller {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, settings: PollSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    /// Poll until the cluster is ready and return the ready listing.
    ///
    /// Listing errors are returned immediately, without retry.
    pub async fn wait_until_ready(&self, descriptor: &ClusterDescriptor) -> Result<Vec<Instance>> {
        let namespace = descriptor.namespace();
        let started = Instant::now();

        loop {
            let instances = self.orchestrator.list_instances(namespace).await?;

            match check_readiness(&instances, descriptor.replicas()) {
                Readiness::Ready => {
                    tracing::debug!(
                        cluster = %namespace,
                        instances = instances.len(),
                        waited = ?started.elapsed(),
                        "All cluster participants running"
                    );
                    return Ok(instances);
                }
                Readiness::CountMismatch { expected, observed } => {
                    tracing::debug!(
                        cluster = %namespace,
                        expected,
                        observed,
                        "Not all replicas created yet"
                    );
                }
                Readiness::NotRunning { instance, phase } => {
                    tracing::debug!(
                        cluster = %namespace,
                        instance = %instance,
                        phase = %phase,
                        "At least one instance not running yet"
                    );
                }
            }

            if let Some(timeout) = self.settings.timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(Error::ReadinessTimeout {
                        namespace: namespace.to_string(),
                        waited,
                    });
                }
            }

            tokio::time::sleep(self.settings.interval).await;
        }
    }
}
