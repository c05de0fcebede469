//! Task scheduler trait definition

use crate::error::Result;
use async_trait::async_trait;
use repoflow_core::TaskEndpoint;
use serde::{Deserialize, Serialize};

/// Status reported by the scheduler once a task has terminated
pub const STATUS_STOPPED: &str = "STOPPED";

/// Managed container-task scheduler abstraction
///
/// Implementations translate these calls into a concrete scheduler API
/// (ECS today). They report failures as `TaskLaunchFailed`,
/// `TaskDescribeFailed` and `StopFailed` respectively.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Returns the scheduler name (e.g., "ecs")
    fn name(&self) -> &str;

    /// Submit a run-task request and return the id of the launched task
    async fn run_task(&self, request: &RunTaskRequest) -> Result<String>;

    /// Query the current state of a task
    async fn describe_task(&self, cluster: &str, task_id: &str) -> Result<TaskSnapshot>;

    /// Ask the scheduler to stop a task
    async fn stop_task(&self, cluster: &str, task_id: &str, reason: &str) -> Result<()>;
}

/// Request to run a single task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTaskRequest {
    pub cluster: String,
    pub task_definition: String,
    /// Free-form tag identifying who started the task (the repo name)
    pub started_by: String,
    pub launch_type: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
}

/// Point-in-time view of a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub last_status: Option<String>,
    pub stopped_reason: Option<String>,
    pub containers: Vec<ContainerSnapshot>,
}

impl TaskSnapshot {
    pub fn is_stopped(&self) -> bool {
        self.last_status.as_deref() == Some(STATUS_STOPPED)
    }

    pub fn container(&self, name: &str) -> Option<&ContainerSnapshot> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Endpoint of the named container, once it has both an address and a port
    pub fn endpoint_for(&self, container_name: &str) -> Option<TaskEndpoint> {
        self.container(container_name)?.endpoint()
    }
}

/// Point-in-time view of one container inside a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub name: String,
    /// Private IPv4 address of each attached network interface, in order
    pub private_addresses: Vec<Option<String>>,
    pub network_bindings: Vec<NetworkBinding>,
}

impl ContainerSnapshot {
    /// First network interface's address and first binding's host port.
    ///
    /// A missing address, a missing binding or a zero port all yield `None`.
    pub fn endpoint(&self) -> Option<TaskEndpoint> {
        let address = self
            .private_addresses
            .first()?
            .as_deref()
            .filter(|a| !a.is_empty())?;
        let port = self.network_bindings.first()?.host_port.filter(|p| *p != 0)?;
        Some(TaskEndpoint::new(address, port))
    }
}

/// Port binding reported for a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkBinding {
    pub container_port: Option<u16>,
    pub host_port: Option<u16>,
}
