//! Cluster lifecycle core
//!
//! - [`ClusterDescriptor`]: what to build, keyed by namespace
//! - [`ReadinessPoller`]: block until every replica is running
//! - [`MeshConfigurator`]: bootstrap the database and wire the replication mesh
//! - [`LifecycleController`]: create pipeline and teardown

pub mod controller;
pub mod descriptor;
pub mod poller;
pub mod replication;

pub use controller::{ClusterReport, CreatePhase, LifecycleController};
pub use descriptor::ClusterDescriptor;
pub use poller::{check_readiness, PollSettings, Readiness, ReadinessPoller};
pub use replication::{plan_edges, MeshConfigurator, ReplicationEdge, ReplicationRequest};
