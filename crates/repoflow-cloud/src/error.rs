//! Scheduler error types

use thiserror::Error;

/// Task scheduler errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Task launch failed: {0}")]
    TaskLaunchFailed(String),

    #[error("Failed to describe task {task_id}: {message}")]
    TaskDescribeFailed { task_id: String, message: String },

    #[error("Endpoint unavailable for task {task_id}: {reason}")]
    EndpointUnavailable { task_id: String, reason: String },

    #[error("Failed to stop task {task_id}: {message}")]
    StopFailed { task_id: String, message: String },
}

pub type Result<T> = std::result::Result<T, CloudError>;
