//! Full-mesh continuous replication between the instances of a cluster
//!
//! Configuration runs in two strictly ordered phases, each preceded by a
//! settle delay so that instance networking is stable before commands are
//! issued:
//! 1. bootstrap: create the database on every instance through its loopback
//! 2. mesh: on every source instance, trigger a continuous pull from its
//!    local database to every other instance
//!
//! Commands run one at a time in listing order. The first failed trigger
//! aborts the mesh and already configured edges are left in place.

use super::ClusterDescriptor;
use crate::common::{database_url, BootstrapPolicy, Error, Result, COUCHDB_PORT};
use crate::orchestrator::{Instance, Orchestrator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Address every instance reaches its own CouchDB on
pub const LOOPBACK: &str = "127.0.0.1";

/// Body of a `POST /_replicate` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationRequest {
    pub source: String,
    pub target: String,
    pub continuous: bool,
}

impl ReplicationRequest {
    /// Continuous replication of the local `database` into the same database on `target_address`
    pub fn continuous(database: &str, target_address: &str) -> Self {
        Self {
            source: database.to_string(),
            target: database_url(target_address, COUCHDB_PORT, database),
            continuous: true,
        }
    }
}

/// Directed replication from `source` into `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationEdge<'a> {
    pub source: &'a Instance,
    pub target: &'a Instance,
}

/// Every ordered pair of instances whose addresses differ, in listing order.
pub fn plan_edges(instances: &[Instance]) -> Vec<ReplicationEdge<'_>> {
    instances
        .iter()
        .flat_map(|source| {
            instances
                .iter()
                .filter(move |target| source.address != target.address)
                .map(move |target| ReplicationEdge { source, target })
        })
        .collect()
}

/// `curl -X PUT` of the database on the instance itself
pub fn bootstrap_command(database: &str) -> Vec<String> {
    ["curl", "-X", "PUT"]
        .into_iter()
        .map(String::from)
        .chain([database_url(LOOPBACK, COUCHDB_PORT, database)])
        .collect()
}

/// `curl -X POST .../_replicate` carrying `request` as JSON
pub fn replicate_command(request: &ReplicationRequest) -> Result<Vec<String>> {
    let body = serde_json::to_string(request)?;
    let replicate_url = format!("http://{}:{}/_replicate", LOOPBACK, COUCHDB_PORT);
    Ok(vec![
        "curl".to_string(),
        "-v".to_string(),
        "-X".to_string(),
        "POST".to_string(),
        replicate_url,
        "-d".to_string(),
        body,
        "-H".to_string(),
        "Content-Type: application/json".to_string(),
    ])
}

pub struct MeshConfigurator {
    orchestrator: Arc<dyn Orchestrator>,
    settle_delay: Duration,
    bootstrap_policy: BootstrapPolicy,
}

impl MeshConfigurator {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        settle_delay: Duration,
        bootstrap_policy: BootstrapPolicy,
    ) -> Self {
        Self {
            orchestrator,
            settle_delay,
            bootstrap_policy,
        }
    }

    /// Bootstrap the database everywhere, then replicate every instance into
    /// every other. Returns the number of edges configured.
    pub async fn configure_mesh(
        &self,
        descriptor: &ClusterDescriptor,
        instances: &[Instance],
    ) -> Result<usize> {
        let namespace = descriptor.namespace();
        if let Some(instance) = instances.iter().find(|i| i.address.is_none()) {
            return Err(Error::MissingAddress(instance.id.clone()));
        }

        self.settle().await;
        self.bootstrap(descriptor, instances).await?;
        self.settle().await;

        let edges = plan_edges(instances);
        tracing::info!(
            cluster = %namespace,
            instances = instances.len(),
            edges = edges.len(),
            "Configuring replication mesh"
        );

        for edge in &edges {
            self.replicate(descriptor, edge).await?;
        }

        Ok(edges.len())
    }

    async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    async fn bootstrap(&self, descriptor: &ClusterDescriptor, instances: &[Instance]) -> Result<()> {
        let command = bootstrap_command(descriptor.database());
        for instance in instances {
            match self.orchestrator.exec(instance, &command).await {
                Ok(()) => {}
                Err(e) if self.bootstrap_policy == BootstrapPolicy::IgnoreAndContinue => {
                    tracing::warn!(
                        cluster = %descriptor.namespace(),
                        instance = %instance.id,
                        error = %e,
                        "Database bootstrap failed, continuing"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn replicate(&self, descriptor: &ClusterDescriptor, edge: &ReplicationEdge<'_>) -> Result<()> {
        let target = edge
            .target
            .address
            .as_deref()
            .ok_or_else(|| Error::MissingAddress(edge.target.id.clone()))?;
        let request = ReplicationRequest::continuous(descriptor.database(), target);
        let command = replicate_command(&request)?;

        tracing::debug!(
            cluster = %descriptor.namespace(),
            source = %edge.source.id,
            target = %request.target,
            "Triggering continuous replication"
        );

        self.orchestrator.exec(edge.source, &command).await.inspect_err(|e| {
            tracing::error!(
                cluster = %descriptor.namespace(),
                source = %edge.source.id,
                target = %request.target,
                error = %e,
                "Replication trigger failed"
            );
        })
    }
}
