//! Configuration for couchmesh components

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "couchmesh.toml";

/// Prefix for environment overrides, e.g. `COUCHMESH__SERVER__BIND_ADDR`
pub const ENV_PREFIX: &str = "COUCHMESH";

/// Largest replica count a workload manifest can carry
pub const MAX_REPLICAS: u32 = i32::MAX as u32;

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cluster: ClusterDefaults,
    pub lifecycle: LifecycleConfig,
    pub backend: Backend,
}

impl Config {
    /// Load `couchmesh.toml` if present, then apply environment overrides.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE, false)
    }

    /// Load from an explicit file. A missing file is an error only when `required`.
    pub fn load_from(path: impl AsRef<Path>, required: bool) -> crate::Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(required))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.cluster.replicas == 0 || self.cluster.replicas > MAX_REPLICAS {
            return Err(crate::Error::InvalidConfig(format!(
                "cluster.replicas must be between 1 and {}",
                MAX_REPLICAS
            )));
        }
        if self.cluster.image.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "cluster.image cannot be empty".into(),
            ));
        }
        if self.lifecycle.poll_interval_ms == 0 {
            return Err(crate::Error::InvalidConfig(
                "lifecycle.poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Which orchestrator the binaries talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Kubernetes,
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "kubernetes" | "kube" | "k8s" => Ok(Backend::Kubernetes),
            "memory" | "mem" => Ok(Backend::Memory),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown backend: {}",
                other
            ))),
        }
    }
}

/// HTTP front-end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for HTTP API
    pub bind_addr: SocketAddr,

    /// Logging level
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
        }
    }
}

/// Values every new cluster is stamped with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterDefaults {
    /// Workload and service name inside the namespace
    pub name: String,

    /// Value of the `heritage` label on every resource
    pub heritage: String,

    pub replicas: u32,

    /// CouchDB container image
    pub image: String,

    /// Kubernetes service type for the cluster endpoint
    pub service_type: String,
}

impl Default for ClusterDefaults {
    fn default() -> Self {
        Self {
            name: "couchdb".to_string(),
            heritage: "couchmesh".to_string(),
            replicas: 3,
            image: "couchdb:1.6.1".to_string(),
            service_type: "LoadBalancer".to_string(),
        }
    }
}

/// What to do when creating the database on an instance fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapPolicy {
    /// Log the failure and carry on with the next instance
    #[default]
    IgnoreAndContinue,
    /// Abort mesh configuration with the failure
    Abort,
}

/// Timings for the create pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Delay between two readiness polls
    pub poll_interval_ms: u64,

    /// Give up waiting for readiness after this long (unset = wait forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_timeout_ms: Option<u64>,

    /// Pause before database bootstrap and again before replication
    pub settle_delay_ms: u64,

    pub bootstrap_policy: BootstrapPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            ready_timeout_ms: None,
            settle_delay_ms: 5000,
            bootstrap_policy: BootstrapPolicy::IgnoreAndContinue,
        }
    }
}

impl LifecycleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cluster.replicas, 3);
        assert_eq!(config.cluster.image, "couchdb:1.6.1");
        assert_eq!(config.lifecycle.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.lifecycle.ready_timeout(), None);
        assert_eq!(config.backend, Backend::Kubernetes);
        assert_eq!(config.server.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
backend = "memory"

[cluster]
replicas = 5
image = "couchdb:2.3"

[lifecycle]
ready_timeout_ms = 60000
bootstrap_policy = "abort"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path(), true).unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.cluster.replicas, 5);
        assert_eq!(config.cluster.image, "couchdb:2.3");
        // untouched fields keep defaults
        assert_eq!(config.cluster.name, "couchdb");
        assert_eq!(config.lifecycle.settle_delay_ms, 5000);
        assert_eq!(
            config.lifecycle.ready_timeout(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(config.lifecycle.bootstrap_policy, BootstrapPolicy::Abort);
    }

    #[test]
    fn test_missing_optional_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml"), false).unwrap();
        assert_eq!(config.cluster.replicas, 3);
    }

    #[test]
    fn test_missing_required_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load_from(dir.path().join("absent.toml"), true).is_err());
    }

    #[test]
    fn test_zero_replicas_rejected() {
        let mut config = Config::default();
        config.cluster.replicas = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_replicas_above_manifest_range_rejected() {
        let mut config = Config::default();
        config.cluster.replicas = 3_000_000_000;
        assert!(config.validate().is_err());

        config.cluster.replicas = MAX_REPLICAS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert_eq!("K8S".parse::<Backend>().unwrap(), Backend::Kubernetes);
        assert!("nomad".parse::<Backend>().is_err());
    }
}
