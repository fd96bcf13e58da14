//! # couchmesh
//!
//! Provision CouchDB clusters on Kubernetes and wire them into a
//! full-mesh continuous replication topology:
//! - one namespace per cluster, holding a service and a replica-set workload
//! - readiness polling until every replica is running
//! - database bootstrap and pairwise `_replicate` triggers executed inside
//!   each instance
//! - teardown by namespace deletion
//!
//! ## Architecture
//!
//! ```text
//!   POST /couchdb?name=demo          DELETE /couchdb/demo
//!            │                                │
//! ┌──────────▼────────────────────────────────▼──────┐
//! │               LifecycleController                │
//! │  namespace → service → workload → ready → mesh   │
//! └──────────┬───────────────────────────────────────┘
//!            │ Orchestrator (kube / in-memory)
//!   ┌────────┴──────────┬───────────────────┐
//! ┌─▼──────────┐   ┌────▼───────┐   ┌───────▼────┐
//! │ couchdb-0  │◄─►│ couchdb-1  │◄─►│ couchdb-2  │
//! └─────▲──────┘   └────────────┘   └──────▲─────┘
//!       └──────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the API server
//! ```bash
//! couchmesh-server serve --bind 0.0.0.0:8080
//! ```
//!
//! ### Drive clusters from the CLI
//! ```bash
//! couchmesh create demo --replicas 3 --ready-timeout 10m
//! couchmesh delete demo
//! ```

pub mod api;
pub mod cluster;
pub mod common;
pub mod orchestrator;

// Re-export commonly used types
pub use cluster::{ClusterDescriptor, LifecycleController};
pub use common::{Config, Error, Result};
pub use orchestrator::{Instance, Orchestrator};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
