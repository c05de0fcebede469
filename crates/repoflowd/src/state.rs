//! Shared application state

use crate::pipeline::DeployPipeline;

/// State shared by every request handler
pub struct AppState {
    pub pipeline: DeployPipeline,
}

impl AppState {
    pub fn new(pipeline: DeployPipeline) -> Self {
        Self { pipeline }
    }
}
