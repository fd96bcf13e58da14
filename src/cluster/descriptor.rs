//! Immutable description of one cluster

use crate::common::config::MAX_REPLICAS;
use crate::common::{validate_database_name, validate_namespace, ClusterDefaults, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything needed to create, locate and destroy one cluster.
///
/// The namespace is the only handle to a cluster's resources: it names the
/// orchestrator namespace, groups the workload and is the teardown key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterDescriptor {
    namespace: String,
    name: String,
    heritage: String,
    replicas: u32,
    image: String,
    database: String,
    service_type: String,
}

impl ClusterDescriptor {
    /// Descriptor for a cluster whose database is named after the cluster.
    pub fn for_create(cluster_name: &str, defaults: &ClusterDefaults) -> Result<Self> {
        Self::new(cluster_name, cluster_name, defaults)
    }

    pub fn new(namespace: &str, database: &str, defaults: &ClusterDefaults) -> Result<Self> {
        validate_namespace(namespace)?;
        validate_database_name(database)?;
        if defaults.replicas == 0 || defaults.replicas > MAX_REPLICAS {
            return Err(crate::Error::InvalidDescriptor(format!(
                "replica count must be between 1 and {}",
                MAX_REPLICAS
            )));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: defaults.name.clone(),
            heritage: defaults.heritage.clone(),
            replicas: defaults.replicas,
            image: defaults.image.clone(),
            database: database.to_string(),
            service_type: defaults.service_type.clone(),
        })
    }

    /// Descriptor that only carries the namespace; the database name is empty.
    pub fn for_teardown(namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        let defaults = ClusterDefaults::default();
        Ok(Self {
            namespace: namespace.to_string(),
            name: defaults.name,
            heritage: defaults.heritage,
            replicas: defaults.replicas,
            image: defaults.image,
            database: String::new(),
            service_type: defaults.service_type,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    /// Labels stamped on every resource of the cluster
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("name".to_string(), self.name.clone()),
            ("heritage".to_string(), self.heritage.clone()),
        ])
    }

    /// Labels the service and workload select instances by
    pub fn selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("name".to_string(), self.name.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_create_uses_cluster_name_for_database() {
        let desc = ClusterDescriptor::for_create("demo", &ClusterDefaults::default()).unwrap();
        assert_eq!(desc.namespace(), "demo");
        assert_eq!(desc.database(), "demo");
        assert_eq!(desc.replicas(), 3);
        assert_eq!(desc.image(), "couchdb:1.6.1");
        assert_eq!(desc.name(), "couchdb");
    }

    #[test]
    fn test_new_with_custom_database() {
        let defaults = ClusterDefaults {
            replicas: 5,
            ..Default::default()
        };
        let desc = ClusterDescriptor::new("demo", "orders", &defaults).unwrap();
        assert_eq!(desc.database(), "orders");
        assert_eq!(desc.replicas(), 5);
    }

    #[test]
    fn test_rejects_bad_input() {
        let defaults = ClusterDefaults::default();
        assert!(ClusterDescriptor::for_create("", &defaults).is_err());
        assert!(ClusterDescriptor::new("demo", "", &defaults).is_err());

        let zero = ClusterDefaults {
            replicas: 0,
            ..Default::default()
        };
        assert!(ClusterDescriptor::for_create("demo", &zero).is_err());

        let too_many = ClusterDefaults {
            replicas: 3_000_000_000,
            ..Default::default()
        };
        assert!(matches!(
            ClusterDescriptor::for_create("demo", &too_many),
            Err(crate::Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_teardown_descriptor_has_empty_database() {
        let desc = ClusterDescriptor::for_teardown("demo").unwrap();
        assert_eq!(desc.namespace(), "demo");
        assert!(desc.database().is_empty());
        assert!(ClusterDescriptor::for_teardown("Not Valid").is_err());
    }

    #[test]
    fn test_labels_and_selector() {
        let desc = ClusterDescriptor::for_create("demo", &ClusterDefaults::default()).unwrap();
        let labels = desc.labels();
        assert_eq!(labels.get("name").map(String::as_str), Some("couchdb"));
        assert_eq!(labels.get("heritage").map(String::as_str), Some("couchmesh"));
        assert_eq!(desc.selector().len(), 1);
    }
}
