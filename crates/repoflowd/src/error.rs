//! API error handling
//!
//! Every stage error maps to a stable `error` kind and an HTTP status, and is
//! rendered as `{ "error": <kind>, "message": <text> }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use repoflow_build::BuildError;
use repoflow_cloud::CloudError;
use repoflow_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Failure of a deploy request, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl DeployError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Core(e) => match e {
                CoreError::InvalidRepoUrl { .. } | CoreError::InvalidRepoName { .. } => {
                    "invalid_repo_url"
                }
                CoreError::UnsupportedLanguage(_) => "unsupported_language",
                CoreError::ConfigLoad { .. } | CoreError::InvalidConfig(_) | CoreError::Io(_) => {
                    "internal_error"
                }
            },
            DeployError::Build(e) => match e {
                // only logged by the pipeline; never returned to a client
                BuildError::PreBuildScript(_) => "pre_build_failed",
                BuildError::ContextNotFound(_)
                | BuildError::BuildFailed(_)
                | BuildError::BuildTimeout { .. }
                | BuildError::DockerConnection(_)
                | BuildError::Io(_) => "build_failed",
                BuildError::AuthToken(_) => "auth_token_error",
                BuildError::MalformedToken(_) => "malformed_token",
                BuildError::RegistryLogin { .. } => "registry_login_failed",
                BuildError::TagFailed { .. } => "tag_failed",
                BuildError::PushFailed { .. } => "push_failed",
            },
            DeployError::Cloud(e) => match e {
                CloudError::TaskLaunchFailed(_) => "task_launch_failed",
                CloudError::TaskDescribeFailed { .. } => "task_describe_failed",
                CloudError::EndpointUnavailable { .. } => "endpoint_unavailable",
                // only logged when cleaning up an unreachable task
                CloudError::StopFailed { .. } => "task_stop_failed",
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            "invalid_repo_url" => StatusCode::BAD_REQUEST,
            "auth_token_error"
            | "malformed_token"
            | "registry_login_failed"
            | "push_failed"
            | "task_launch_failed"
            | "task_describe_failed" => StatusCode::BAD_GATEWAY,
            "endpoint_unavailable" => StatusCode::GATEWAY_TIMEOUT,
            // unsupported_language stays 500 for client compatibility
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Operator-facing hint for build and publish failures
    pub fn operator_hint(&self) -> Option<String> {
        match self {
            DeployError::Build(e) => Some(e.user_message()),
            DeployError::Core(_) | DeployError::Cloud(_) => None,
        }
    }
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.kind(), self.to_string());
        (self.status_code(), Json(body)).into_response()
    }
}
