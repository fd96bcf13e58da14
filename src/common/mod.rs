//! Common utilities and types shared across couchmesh

pub mod config;
pub mod error;
pub mod utils;

pub use config::{Backend, BootstrapPolicy, ClusterDefaults, Config, LifecycleConfig, ServerConfig};
pub use error::{Error, Result};
pub use utils::{database_url, parse_duration, validate_database_name, validate_namespace, COUCHDB_PORT};
