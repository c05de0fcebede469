//! AWS provider for RepoFlow
//!
//! Implements the registry token source on ECR Public and the task
//! scheduler on ECS.
//!
//! # Requirements
//!
//! - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (or any source the default
//!   AWS credential chain understands)
//! - An ECS cluster with a task definition per deployed repo
//!
//! # Example
//!
//! ```ignore
//! use repoflow_cloud_aws::{EcrPublicTokenSource, EcsScheduler, load_sdk_config};
//!
//! let sdk_config = load_sdk_config(&config.aws).await;
//! let tokens = EcrPublicTokenSource::new(&sdk_config);
//! let scheduler = EcsScheduler::new(&sdk_config);
//! ```

pub mod ecr;
pub mod ecs;
pub mod session;

pub use ecr::EcrPublicTokenSource;
pub use ecs::EcsScheduler;
pub use session::load_sdk_config;
