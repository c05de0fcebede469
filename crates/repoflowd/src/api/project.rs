//! Project deploy API
//!
//! `POST /project` builds, publishes and runs a repository, then answers
//! with the URL the running task is reachable at.

use axum::{Json, Router, extract::State, routing::post};
use repoflow_core::DeployRequest;
use std::sync::Arc;

use crate::error::DeployError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/project", post(deploy_project))
}

async fn deploy_project(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeployRequest>,
) -> Result<Json<String>, DeployError> {
    match state.pipeline.deploy(&request).await {
        Ok(outcome) => {
            tracing::info!(
                "Deployed {} as task {} at {}",
                outcome.repo_name,
                outcome.task_id,
                outcome.endpoint
            );
            Ok(Json(outcome.endpoint.url()))
        }
        Err(e) => {
            tracing::error!("Deploy of {} failed [{}]: {}", request.giturl, e.kind(), e);
            if let Some(hint) = e.operator_hint() {
                tracing::warn!("{}", hint);
            }
            Err(e)
        }
    }
}
