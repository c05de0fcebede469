//! RepoFlow deploy daemon
//!
//! Exposes `POST /project`: given a git URL and a language, the daemon
//! builds the repository into an image, publishes it to the registry,
//! runs it as a task and returns the task's URL.

pub mod api;
pub mod error;
pub mod pipeline;
pub mod state;

pub use api::router;
pub use error::{DeployError, ErrorResponse};
pub use pipeline::{DeployPipeline, RepoLockGuard, RepoLocks};
pub use state::AppState;
