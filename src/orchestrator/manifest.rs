//! Kubernetes resources for a cluster, built from its descriptor

use crate::cluster::ClusterDescriptor;
use crate::common::COUCHDB_PORT;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, HTTPGetAction, Namespace, PodSpec, PodTemplateSpec, Probe, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Path the liveness probe polls
pub const LIVENESS_PATH: &str = "/_stats";

pub fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn service(desc: &ClusterDescriptor) -> Service {
    Service {
        metadata: object_meta(desc),
        spec: Some(ServiceSpec {
            selector: Some(desc.selector()),
            type_: Some(desc.service_type().to_string()),
            ports: Some(vec![ServicePort {
                port: COUCHDB_PORT.into(),
                target_port: Some(IntOrString::Int(COUCHDB_PORT.into())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn deployment(desc: &ClusterDescriptor) -> Deployment {
    let container = Container {
        name: desc.name().to_string(),
        image: Some(desc.image().to_string()),
        ports: Some(vec![ContainerPort {
            container_port: COUCHDB_PORT.into(),
            ..Default::default()
        }]),
        liveness_probe: Some(Probe {
            http_get: Some(HTTPGetAction {
                path: Some(LIVENESS_PATH.to_string()),
                port: IntOrString::Int(COUCHDB_PORT.into()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    Deployment {
        metadata: object_meta(desc),
        spec: Some(DeploymentSpec {
            // descriptors never exceed MAX_REPLICAS
            replicas: Some(i32::try_from(desc.replicas()).unwrap_or(i32::MAX)),
            selector: LabelSelector {
                match_labels: Some(desc.selector()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    namespace: Some(desc.namespace().to_string()),
                    labels: Some(desc.labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn object_meta(desc: &ClusterDescriptor) -> ObjectMeta {
    ObjectMeta {
        name: Some(desc.name().to_string()),
        namespace: Some(desc.namespace().to_string()),
        labels: Some(desc.labels()),
        ..Default::default()
    }
}
