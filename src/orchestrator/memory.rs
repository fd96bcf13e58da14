//! In-process backend for [`Orchestrator`]
//!
//! Clusters live in a map keyed by namespace. Once a workload exists its
//! instances are reported as running straight away, addressed
//! `10.<cluster / 256>.<cluster % 256>.<ordinal>`. Recent calls are recorded
//! in order, and failures
//! can be injected per step, per exec call or by scripting instance
//! listings, which makes the backend usable both for local runs and as a
//! test double.

use super::{Instance, InstancePhase, Orchestrator};
use crate::cluster::ClusterDescriptor;
use crate::common::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard};

/// Oldest calls are dropped once the log holds this many
pub const MAX_RECORDED_CALLS: usize = 4096;

/// One host octet per instance, `.1` to `.254`
pub const MAX_INSTANCES: u32 = 254;

/// One recorded orchestrator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateNamespace(String),
    DeleteNamespace(String),
    CreateService(String),
    CreateWorkload(String),
    ListInstances(String),
    Exec { instance: String, command: Vec<String> },
}

impl Call {
    pub fn step(&self) -> Step {
        match self {
            Call::CreateNamespace(_) => Step::CreateNamespace,
            Call::DeleteNamespace(_) => Step::DeleteNamespace,
            Call::CreateService(_) => Step::CreateService,
            Call::CreateWorkload(_) => Step::CreateWorkload,
            Call::ListInstances(_) => Step::ListInstances,
            Call::Exec { .. } => Step::Exec,
        }
    }
}

/// Kind of orchestrator call, used for fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CreateNamespace,
    DeleteNamespace,
    CreateService,
    CreateWorkload,
    ListInstances,
    Exec,
}

#[derive(Debug)]
struct Workload {
    name: String,
    replicas: u32,
}

#[derive(Debug)]
struct NamespaceState {
    subnet: u16,
    service: bool,
    workload: Option<Workload>,
}

#[derive(Debug, Default)]
struct State {
    namespaces: HashMap<String, NamespaceState>,
    next_subnet: u16,
    calls: VecDeque<Call>,
    failing_steps: HashSet<Step>,
    failing_execs: HashSet<usize>,
    exec_count: usize,
    scripted_listings: VecDeque<Vec<Instance>>,
}

impl State {
    fn record(&mut self, call: Call) {
        if self.calls.len() == MAX_RECORDED_CALLS {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }

    fn check(&self, step: Step) -> Result<()> {
        if self.failing_steps.contains(&step) {
            return Err(Error::Orchestrator(format!("injected {:?} failure", step)));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrchestrator {
    state: Mutex<State>,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent call of kind `step` fail
    pub fn fail_step(&self, step: Step) {
        self.lock().failing_steps.insert(step);
    }

    /// Make the `nth` exec call (0-based, counted across all instances) fail
    pub fn fail_exec(&self, nth: usize) {
        self.lock().failing_execs.insert(nth);
    }

    /// Queue a listing returned by the next `list_instances` call instead of
    /// the synthesised one.
    pub fn push_listing(&self, instances: Vec<Instance>) {
        self.lock().scripted_listings.push_back(instances);
    }

    /// The last [`MAX_RECORDED_CALLS`] calls received, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.iter().cloned().collect()
    }

    /// Commands of the recorded exec calls, in order
    pub fn exec_calls(&self) -> Vec<(String, Vec<String>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Exec { instance, command } => Some((instance.clone(), command.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.lock().namespaces.contains_key(namespace)
    }

    pub fn has_service(&self, namespace: &str) -> bool {
        self.lock()
            .namespaces
            .get(namespace)
            .is_some_and(|ns| ns.service)
    }
}

fn instance_address(subnet: u16, ordinal: u8) -> String {
    let [hi, lo] = subnet.to_be_bytes();
    Ipv4Addr::new(10, hi, lo, ordinal).to_string()
}

/// A running instance as this backend reports it
pub fn running_instance(namespace: &str, id: &str, address: &str) -> Instance {
    Instance {
        id: id.to_string(),
        namespace: namespace.to_string(),
        address: Some(address.to_string()),
        phase: InstancePhase::Running,
        container: "couchdb".to_string(),
    }
}

#[async_trait]
impl Orchestrator for InMemoryOrchestrator {
    async fn create_namespace(&self, namespace: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::CreateNamespace(namespace.to_string()));
        state.check(Step::CreateNamespace)?;

        if state.namespaces.contains_key(namespace) {
            return Err(Error::Orchestrator(format!(
                "namespace {} already exists",
                namespace
            )));
        }
        let subnet = state.next_subnet;
        state.next_subnet = state.next_subnet.wrapping_add(1);
        state.namespaces.insert(
            namespace.to_string(),
            NamespaceState {
                subnet,
                service: false,
                workload: None,
            },
        );
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::DeleteNamespace(namespace.to_string()));
        state.check(Step::DeleteNamespace)?;

        state
            .namespaces
            .remove(namespace)
            .map(|_| ())
            .ok_or_else(|| Error::NamespaceNotFound(namespace.to_string()))
    }

    async fn create_service(&self, descriptor: &ClusterDescriptor) -> Result<()> {
        let mut state = self.lock();
        let namespace = descriptor.namespace();
        state.record(Call::CreateService(namespace.to_string()));
        state.check(Step::CreateService)?;

        let ns = state
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| Error::NamespaceNotFound(namespace.to_string()))?;
        ns.service = true;
        Ok(())
    }

    async fn create_workload(&self, descriptor: &ClusterDescriptor) -> Result<()> {
        let mut state = self.lock();
        let namespace = descriptor.namespace();
        state.record(Call::CreateWorkload(namespace.to_string()));
        state.check(Step::CreateWorkload)?;

        if descriptor.replicas() > MAX_INSTANCES {
            return Err(Error::Orchestrator(format!(
                "memory backend runs at most {} instances per cluster, {} requested",
                MAX_INSTANCES,
                descriptor.replicas()
            )));
        }

        let ns = state
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| Error::NamespaceNotFound(namespace.to_string()))?;
        ns.workload = Some(Workload {
            name: descriptor.name().to_string(),
            replicas: descriptor.replicas(),
        });
        Ok(())
    }

    async fn list_instances(&self, namespace: &str) -> Result<Vec<Instance>> {
        let mut state = self.lock();
        state.record(Call::ListInstances(namespace.to_string()));
        state.check(Step::ListInstances)?;

        if let Some(scripted) = state.scripted_listings.pop_front() {
            return Ok(scripted);
        }

        let Some(ns) = state.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        let Some(workload) = &ns.workload else {
            return Ok(Vec::new());
        };

        Ok((0..workload.replicas)
            .zip(1..=u8::MAX)
            .map(|(i, ordinal)| Instance {
                container: workload.name.clone(),
                ..running_instance(
                    namespace,
                    &format!("{}-{}", workload.name, i),
                    &instance_address(ns.subnet, ordinal),
                )
            })
            .collect())
    }

    async fn exec(&self, instance: &Instance, command: &[String]) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::Exec {
            instance: instance.id.clone(),
            command: command.to_vec(),
        });
        let nth = state.exec_count;
        state.exec_count += 1;
        state.check(Step::Exec)?;

        if state.failing_execs.contains(&nth) {
            return Err(Error::Exec {
                instance: instance.id.clone(),
                reason: format!("injected failure on exec #{}", nth),
            });
        }
        Ok(())
    }
}
