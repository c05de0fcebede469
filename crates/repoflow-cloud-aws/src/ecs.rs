//! ECS task scheduler

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs::Client;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, Container, Failure, LaunchType, NetworkConfiguration,
    Task,
};
use repoflow_cloud::{
    CloudError, ContainerSnapshot, NetworkBinding, RunTaskRequest, TaskScheduler, TaskSnapshot,
};

/// Runs tasks on an ECS cluster
pub struct EcsScheduler {
    client: Client,
}

impl EcsScheduler {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl TaskScheduler for EcsScheduler {
    fn name(&self) -> &str {
        "ecs"
    }

    async fn run_task(&self, request: &RunTaskRequest) -> repoflow_cloud::Result<String> {
        let network = network_configuration(request)?;

        let output = self
            .client
            .run_task()
            .cluster(&request.cluster)
            .task_definition(&request.task_definition)
            .launch_type(LaunchType::from(request.launch_type.as_str()))
            .started_by(&request.started_by)
            .count(1)
            .network_configuration(network)
            .send()
            .await
            .map_err(|e| CloudError::TaskLaunchFailed(DisplayErrorContext(&e).to_string()))?;

        match output.tasks().first().and_then(|t| t.task_arn()) {
            Some(arn) => Ok(arn.to_string()),
            None => Err(CloudError::TaskLaunchFailed(match output.failures().first() {
                Some(failure) => describe_failure(failure),
                None => "no task returned".to_string(),
            })),
        }
    }

    async fn describe_task(
        &self,
        cluster: &str,
        task_id: &str,
    ) -> repoflow_cloud::Result<TaskSnapshot> {
        let output = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .tasks(task_id)
            .send()
            .await
            .map_err(|e| CloudError::TaskDescribeFailed {
                task_id: task_id.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        match output.tasks().first() {
            Some(task) => Ok(to_snapshot(task_id, task)),
            None => Err(CloudError::TaskDescribeFailed {
                task_id: task_id.to_string(),
                message: match output.failures().first() {
                    Some(failure) => describe_failure(failure),
                    None => "task not found".to_string(),
                },
            }),
        }
    }

    async fn stop_task(
        &self,
        cluster: &str,
        task_id: &str,
        reason: &str,
    ) -> repoflow_cloud::Result<()> {
        self.client
            .stop_task()
            .cluster(cluster)
            .task(task_id)
            .reason(reason)
            .send()
            .await
            .map_err(|e| CloudError::StopFailed {
                task_id: task_id.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!("Stopped task {}", task_id);
        Ok(())
    }
}

fn network_configuration(request: &RunTaskRequest) -> repoflow_cloud::Result<NetworkConfiguration> {
    let assign_public_ip = if request.assign_public_ip {
        AssignPublicIp::Enabled
    } else {
        AssignPublicIp::Disabled
    };

    let vpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(request.subnets.clone()))
        .set_security_groups(Some(request.security_groups.clone()))
        .assign_public_ip(assign_public_ip)
        .build()
        .map_err(|e| CloudError::TaskLaunchFailed(format!("invalid network configuration: {}", e)))?;

    Ok(NetworkConfiguration::builder()
        .awsvpc_configuration(vpc)
        .build())
}

fn describe_failure(failure: &Failure) -> String {
    let reason = failure.reason().unwrap_or("unknown failure");
    match failure.detail() {
        Some(detail) => format!("{} ({})", reason, detail),
        None => reason.to_string(),
    }
}

fn to_snapshot(task_id: &str, task: &Task) -> TaskSnapshot {
    TaskSnapshot {
        task_id: task.task_arn().unwrap_or(task_id).to_string(),
        last_status: task.last_status().map(str::to_string),
        stopped_reason: task.stopped_reason().map(str::to_string),
        containers: task.containers().iter().map(to_container).collect(),
    }
}

fn to_container(container: &Container) -> ContainerSnapshot {
    ContainerSnapshot {
        name: container.name().unwrap_or_default().to_string(),
        private_addresses: container
            .network_interfaces()
            .iter()
            .map(|ni| ni.private_ipv4_address().map(str::to_string))
            .collect(),
        // Ports outside u16 are treated as absent
        network_bindings: container
            .network_bindings()
            .iter()
            .map(|nb| NetworkBinding {
                container_port: nb.container_port().and_then(|p| u16::try_from(p).ok()),
                host_port: nb.host_port().and_then(|p| u16::try_from(p).ok()),
            })
            .collect(),
    }
}
