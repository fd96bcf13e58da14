//! Kubernetes backend for [`Orchestrator`]

use super::{manifest, Instance, InstancePhase, Orchestrator};
use crate::cluster::ClusterDescriptor;
use crate::common::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::{Api, AttachParams, DeleteParams, ListParams, PostParams};
use kube::Client;
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct KubeOrchestrator {
    client: Client,
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn create_namespace(&self, namespace: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), &manifest::namespace(namespace))
            .await?;
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.delete(namespace, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn create_service(&self, descriptor: &ClusterDescriptor) -> Result<()> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), descriptor.namespace());
        api.create(&PostParams::default(), &manifest::service(descriptor))
            .await?;
        Ok(())
    }

    async fn create_workload(&self, descriptor: &ClusterDescriptor) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), descriptor.namespace());
        api.create(&PostParams::default(), &manifest::deployment(descriptor))
            .await?;
        Ok(())
    }

    async fn list_instances(&self, namespace: &str) -> Result<Vec<Instance>> {
        let pods = self.pods(namespace).list(&ListParams::default()).await?;
        Ok(pods
            .items
            .into_iter()
            .map(|pod| instance_from_pod(pod, namespace))
            .collect())
    }

    async fn exec(&self, instance: &Instance, command: &[String]) -> Result<()> {
        let params = AttachParams::default()
            .container(instance.container.clone())
            .stdin(false)
            .stdout(true)
            .stderr(true);

        let mut attached = self
            .pods(&instance.namespace)
            .exec(&instance.id, command.to_vec(), &params)
            .await?;

        // Both streams must be drained or the remote side can stall.
        let stdout = attached.stdout();
        let stderr = attached.stderr();
        let (_, stderr) = futures_util::future::try_join(drain(stdout), drain(stderr)).await?;

        let status = match attached.take_status() {
            Some(status) => status.await,
            None => None,
        };

        match status {
            Some(status) if status.status.as_deref() == Some("Success") => Ok(()),
            Some(status) => Err(Error::Exec {
                instance: instance.id.clone(),
                reason: status
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| stderr.trim().to_string()),
            }),
            None => Err(Error::Exec {
                instance: instance.id.clone(),
                reason: "exec stream closed without a status".into(),
            }),
        }
    }
}

async fn drain(stream: Option<impl AsyncRead + Unpin>) -> Result<String> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn instance_from_pod(pod: Pod, namespace: &str) -> Instance {
    let status = pod.status.unwrap_or_default();
    let container = pod
        .spec
        .and_then(|spec| spec.containers.into_iter().next())
        .map(|c| c.name)
        .unwrap_or_default();

    Instance {
        id: pod.metadata.name.unwrap_or_default(),
        namespace: pod
            .metadata
            .namespace
            .unwrap_or_else(|| namespace.to_string()),
        address: status.pod_ip.filter(|ip| !ip.is_empty()),
        phase: status
            .phase
            .as_deref()
            .map_or(InstancePhase::Unknown, InstancePhase::parse),
        container,
    }
}
