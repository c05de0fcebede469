//! Task launcher
//!
//! Runs the published image as a task and waits, with exponential backoff,
//! until the scheduler reports an address and port for the target container.

use crate::error::{CloudError, Result};
use crate::provider::{RunTaskRequest, TaskScheduler};
use repoflow_core::{RepoName, SchedulerConfig, TaskEndpoint};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A task that was launched and became reachable
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchedTask {
    pub task_id: String,
    pub endpoint: TaskEndpoint,
}

pub struct TaskLauncher {
    scheduler: Arc<dyn TaskScheduler>,
    config: SchedulerConfig,
}

impl TaskLauncher {
    pub fn new(scheduler: Arc<dyn TaskScheduler>, config: SchedulerConfig) -> Self {
        Self { scheduler, config }
    }

    /// Build the run-task request for a repo
    pub fn run_request(&self, repo: &RepoName) -> RunTaskRequest {
        RunTaskRequest {
            cluster: self.config.cluster.clone(),
            task_definition: self.config.task_definition_for(repo),
            started_by: repo.to_string(),
            launch_type: self.config.launch_type.clone(),
            subnets: self.config.subnets.clone(),
            security_groups: self.config.security_groups.clone(),
            assign_public_ip: self.config.assign_public_ip,
        }
    }

    /// Launch a task for `repo` and wait for its endpoint
    pub async fn launch(&self, repo: &RepoName) -> Result<LaunchedTask> {
        let request = self.run_request(repo);
        tracing::info!(
            "Running task definition '{}' on cluster '{}' via {}",
            request.task_definition,
            request.cluster,
            self.scheduler.name()
        );

        let task_id = self.scheduler.run_task(&request).await?;
        tracing::info!("Task launched: {}", task_id);

        let endpoint = self.wait_for_endpoint(&task_id).await?;
        tracing::info!("Task {} reachable at {}", task_id, endpoint);

        Ok(LaunchedTask { task_id, endpoint })
    }

    /// Poll the task until the target container has an address and a port.
    ///
    /// Describe errors end the wait immediately. A stopped task, or running
    /// out of attempts, is `EndpointUnavailable`; in the latter case the
    /// task is stopped so it does not linger unreachable.
    pub async fn wait_for_endpoint(&self, task_id: &str) -> Result<TaskEndpoint> {
        let poll = &self.config.poll;
        let container_name = &self.config.container_name;

        for attempt in 0..poll.max_attempts {
            let snapshot = self
                .scheduler
                .describe_task(&self.config.cluster, task_id)
                .await?;

            if let Some(endpoint) = snapshot.endpoint_for(container_name) {
                return Ok(endpoint);
            }

            if snapshot.is_stopped() {
                return Err(CloudError::EndpointUnavailable {
                    task_id: task_id.to_string(),
                    reason: format!(
                        "task stopped before becoming reachable: {}",
                        snapshot
                            .stopped_reason
                            .as_deref()
                            .unwrap_or("no reason given")
                    ),
                });
            }

            tracing::debug!(
                "Task {} not ready (status: {}, attempt {}/{})",
                task_id,
                snapshot.last_status.as_deref().unwrap_or("unknown"),
                attempt + 1,
                poll.max_attempts
            );

            if attempt + 1 < poll.max_attempts {
                sleep(Duration::from_millis(poll.delay_for_attempt(attempt))).await;
            }
        }

        self.stop_unreachable(task_id).await;

        Err(CloudError::EndpointUnavailable {
            task_id: task_id.to_string(),
            reason: format!(
                "container '{}' has no address and port after {} attempts",
                container_name, poll.max_attempts
            ),
        })
    }

    async fn stop_unreachable(&self, task_id: &str) {
        if let Err(e) = self
            .scheduler
            .stop_task(
                &self.config.cluster,
                task_id,
                "repoflow: endpoint unavailable",
            )
            .await
        {
            tracing::warn!("{}", e);
        }
    }
}
